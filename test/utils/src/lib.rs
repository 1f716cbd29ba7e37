/// Agent stream matching the `/api/chat` wire format: two progress records
/// followed by a terminal response.
pub fn chat_stream_fixture() -> &'static str {
    return concat!(
        "data: {\"type\": \"progress\", \"step\": 1, \"total\": 2, \"message\": \"thinking\"}\n\n",
        "data: {\"type\": \"progress\", \"step\": 2, \"total\": 2, \"message\": \"drafting\"}\n\n",
        "data: {\"type\": \"response\", \"content\": \"hi there\"}\n\n",
    );
}

/// Same exchange as `chat_stream_fixture` with noise records interleaved.
pub fn noisy_chat_stream_fixture() -> &'static str {
    return concat!(
        ": keep-alive\n\n",
        "data: {\"type\": \"progress\", \"step\": 1, \"total\": 3, \"message\": \"searching\"}\n\n",
        "noise\n\n",
        "data: {not json}\n\n",
        "data: {\"type\": \"tool_call\", \"name\": \"browse\"}\n\n",
        "data: {\"type\": \"response\", \"content\": \"done\"}\n\n",
    );
}

/// Splits a body into chunks of `size` bytes, ignoring char boundaries.
pub fn chunk_bytes(body: &str, size: usize) -> Vec<Vec<u8>> {
    return body
        .as_bytes()
        .chunks(size)
        .map(|chunk| return chunk.to_vec())
        .collect();
}

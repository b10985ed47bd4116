use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use specdraft_common::{Error, Result};

/// Splits a server-sent-event byte stream into the JSON payloads of its
/// `data:` lines. Comment lines, event names and blank separators are
/// dropped; a transport error ends the stream with one `Err` item.
pub(crate) fn data_lines(
    stream: BoxStream<'static, reqwest::Result<Bytes>>,
) -> BoxStream<'static, Result<String>> {
    let buffer = Vec::new();

    stream::try_unfold(
        (stream, buffer),
        |(mut stream, mut buffer): (BoxStream<'static, reqwest::Result<Bytes>>, Vec<u8>)| async move {
            loop {
                if let Some(i) = buffer.iter().position(|&b| b == b'\n') {
                    let line_bytes: Vec<u8> = buffer.drain(0..=i).collect();
                    let line = String::from_utf8_lossy(&line_bytes).trim().to_string();

                    if let Some(data) = line.strip_prefix("data:") {
                        let data = data.trim_start();
                        if !data.is_empty() && data != "[DONE]" {
                            return Ok(Some((data.to_string(), (stream, buffer))));
                        }
                    }
                    continue;
                }

                match stream.next().await {
                    Some(Ok(chunk)) => {
                        buffer.extend_from_slice(&chunk);
                    }
                    Some(Err(e)) => return Err(Error::Upstream(format!("stream error: {e}"))),
                    None => return Ok(None),
                }
            }
        },
    )
    .boxed()
}

use lilyrose::config::LilyConfig;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{Duration, sleep, timeout};
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .expect("bind ephemeral")
        .local_addr()
        .expect("local addr")
        .port()
}

fn tmp_data_path() -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system clock before epoch")
        .as_nanos();
    std::env::temp_dir()
        .join(format!("lilyrose-voice-test-{nanos}/memory.json"))
        .to_string_lossy()
        .into_owned()
}

async fn mock_backends(config: &mut LilyConfig, reply: &str) -> (MockServer, MockServer) {
    let classifier = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([[
            {"label": "neutral", "score": 0.9}
        ]])))
        .mount(&classifier)
        .await;

    let completion = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": reply } }]
        })))
        .mount(&completion)
        .await;

    config.classifier.endpoint = classifier.uri();
    config.completion.endpoint = completion.uri();
    config.completion.models = vec!["test-model".into()];

    (classifier, completion)
}

fn voice_config(port: u16) -> LilyConfig {
    let mut config = LilyConfig::default();
    config.gateway.bind = "127.0.0.1".to_string();
    config.gateway.port = port;
    config.memory.data_path = tmp_data_path();
    config
}

/// Minimal hand-rolled WebSocket client, enough for masked text frames.
struct WsClient {
    stream: TcpStream,
    read_buffer: Vec<u8>,
}

impl WsClient {
    async fn connect(host: &str, port: u16, path: &str) -> anyhow::Result<Self> {
        let mut stream = TcpStream::connect((host, port)).await?;
        let request = format!(
            "GET {path} HTTP/1.1\r\n\
             Host: {host}:{port}\r\n\
             Upgrade: websocket\r\n\
             Connection: Upgrade\r\n\
             Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\
             Sec-WebSocket-Version: 13\r\n\
             \r\n"
        );
        stream.write_all(request.as_bytes()).await?;

        let mut response = Vec::new();
        let header_end;
        loop {
            let mut buf = [0u8; 1024];
            let n = stream.read(&mut buf).await?;
            if n == 0 {
                anyhow::bail!("websocket handshake closed early");
            }
            response.extend_from_slice(&buf[..n]);
            if let Some(pos) = response.windows(4).position(|w| w == b"\r\n\r\n") {
                header_end = pos + 4;
                break;
            }
        }

        let response_text = String::from_utf8_lossy(&response[..header_end]);
        anyhow::ensure!(
            response_text.starts_with("HTTP/1.1 101"),
            "unexpected websocket handshake response: {response_text}"
        );

        Ok(Self {
            stream,
            read_buffer: response[header_end..].to_vec(),
        })
    }

    async fn send_text(&mut self, payload: &str) -> anyhow::Result<()> {
        let payload = payload.as_bytes();
        let mut frame = Vec::with_capacity(payload.len() + 14);
        frame.push(0x81); // FIN + text frame

        let mask_bit = 0x80u8;
        if payload.len() < 126 {
            frame.push(mask_bit | payload.len() as u8);
        } else if payload.len() <= u16::MAX as usize {
            frame.push(mask_bit | 126);
            frame.extend_from_slice(&(payload.len() as u16).to_be_bytes());
        } else {
            frame.push(mask_bit | 127);
            frame.extend_from_slice(&(payload.len() as u64).to_be_bytes());
        }

        let mask = [0x12u8, 0x34, 0x56, 0x78];
        frame.extend_from_slice(&mask);
        for (i, b) in payload.iter().enumerate() {
            frame.push(b ^ mask[i % 4]);
        }

        self.stream.write_all(&frame).await?;
        Ok(())
    }

    async fn read_exact_ws(&mut self, buf: &mut [u8]) -> anyhow::Result<()> {
        let mut offset = 0usize;
        while offset < buf.len() {
            if !self.read_buffer.is_empty() {
                let take = (buf.len() - offset).min(self.read_buffer.len());
                buf[offset..offset + take].copy_from_slice(&self.read_buffer[..take]);
                self.read_buffer.drain(..take);
                offset += take;
                continue;
            }

            let n = self.stream.read(&mut buf[offset..]).await?;
            if n == 0 {
                anyhow::bail!("connection closed while reading websocket frame");
            }
            offset += n;
        }

        Ok(())
    }

    async fn recv_text(&mut self) -> anyhow::Result<String> {
        let mut header = [0u8; 2];
        self.read_exact_ws(&mut header).await?;

        let opcode = header[0] & 0x0f;
        let masked = (header[1] & 0x80) != 0;
        let mut len = (header[1] & 0x7f) as u64;

        if len == 126 {
            let mut ext = [0u8; 2];
            self.read_exact_ws(&mut ext).await?;
            len = u16::from_be_bytes(ext) as u64;
        } else if len == 127 {
            let mut ext = [0u8; 8];
            self.read_exact_ws(&mut ext).await?;
            len = u64::from_be_bytes(ext);
        }

        let mut mask = [0u8; 4];
        if masked {
            self.read_exact_ws(&mut mask).await?;
        }

        let mut payload = vec![0u8; len as usize];
        self.read_exact_ws(&mut payload).await?;

        if masked {
            for (i, b) in payload.iter_mut().enumerate() {
                *b ^= mask[i % 4];
            }
        }

        match opcode {
            0x1 => Ok(String::from_utf8(payload)?),
            0x8 => anyhow::bail!("received close frame"),
            other => anyhow::bail!("unexpected opcode: {other}"),
        }
    }

    async fn recv_json(&mut self, label: &str) -> anyhow::Result<serde_json::Value> {
        let text = timeout(Duration::from_secs(5), self.recv_text())
            .await
            .map_err(|_| anyhow::anyhow!("timeout waiting for websocket frame: {label}"))??;
        Ok(serde_json::from_str(&text)?)
    }
}

async fn connect_ws_with_retry(port: u16, session_id: &str) -> WsClient {
    let path = format!("/ws/voice/{session_id}");
    let mut last_err = None;
    for _ in 0..40 {
        match WsClient::connect("127.0.0.1", port, &path).await {
            Ok(client) => return client,
            Err(e) => {
                last_err = Some(e);
                sleep(Duration::from_millis(50)).await;
            }
        }
    }
    panic!("failed to connect websocket: {last_err:?}");
}

#[tokio::test]
async fn wrong_token_is_rejected_with_auth_failed() {
    let port = free_port();
    let config = voice_config(port);
    let gateway = tokio::spawn(async move {
        let _ = lilyrose::gateway::run(config, Some("secret-token".to_string())).await;
    });

    let mut ws = connect_ws_with_retry(port, "device-1").await;
    ws.send_text(r#"{"token":"wrong-token"}"#).await.unwrap();

    let response = ws.recv_json("auth reply").await.unwrap();
    assert_eq!(response["error"], "auth_failed");
    assert_eq!(response["code"], 4001);

    gateway.abort();
    let _ = gateway.await;
}

#[tokio::test]
async fn loopback_voice_turn_listens_then_responds() {
    let port = free_port();
    let mut config = voice_config(port);
    let (_classifier, _completion) = mock_backends(&mut config, "Sure, got it!").await;

    let gateway = tokio::spawn(async move {
        let _ = lilyrose::gateway::run(config, None).await;
    });

    // No auth handshake in loopback mode; first frame is a command.
    let mut ws = connect_ws_with_retry(port, "device-1").await;
    ws.send_text(r#"{"type":"start_listening"}"#).await.unwrap();

    let status = ws.recv_json("status frame").await.unwrap();
    assert_eq!(status["type"], "status");
    assert_eq!(status["status"], "listening");

    ws.send_text(r#"{"type":"audio_data","audio":"AAAA"}"#)
        .await
        .unwrap();

    let reply = ws.recv_json("ai_response frame").await.unwrap();
    assert_eq!(reply["type"], "ai_response");
    assert_eq!(reply["status"], "completed");
    let text = reply["text"].as_str().expect("text string");
    assert!(text.ends_with("got it!"));

    gateway.abort();
    let _ = gateway.await;
}

#[tokio::test]
async fn correct_token_unlocks_the_voice_session() {
    let port = free_port();
    let mut config = voice_config(port);
    let (_classifier, _completion) = mock_backends(&mut config, "Hello!").await;

    let gateway = tokio::spawn(async move {
        let _ = lilyrose::gateway::run(config, Some("secret-token".to_string())).await;
    });

    let mut ws = connect_ws_with_retry(port, "device-1").await;
    ws.send_text(r#"{"token":"secret-token"}"#).await.unwrap();

    ws.send_text(r#"{"type":"start_listening"}"#).await.unwrap();
    let status = ws.recv_json("status frame").await.unwrap();
    assert_eq!(status["status"], "listening");

    gateway.abort();
    let _ = gateway.await;
}

#[tokio::test]
async fn malformed_frame_gets_error_reply_and_keeps_connection() {
    let port = free_port();
    let mut config = voice_config(port);
    let (_classifier, _completion) = mock_backends(&mut config, "Hello!").await;

    let gateway = tokio::spawn(async move {
        let _ = lilyrose::gateway::run(config, None).await;
    });

    let mut ws = connect_ws_with_retry(port, "device-1").await;
    ws.send_text(r#"{"type":"no_such_command"}"#).await.unwrap();

    let error = ws.recv_json("error frame").await.unwrap();
    assert_eq!(error["type"], "error");
    assert!(error["message"].as_str().expect("message").contains("malformed frame"));

    // The connection survives a bad frame.
    ws.send_text(r#"{"type":"start_listening"}"#).await.unwrap();
    let status = ws.recv_json("status frame").await.unwrap();
    assert_eq!(status["status"], "listening");

    gateway.abort();
    let _ = gateway.await;
}

use serde::Deserialize;
use subtle::ConstantTimeEq;

#[derive(Deserialize)]
struct ConnectFrame {
    token: Option<String>,
}

/// Check the first WebSocket frame against the configured token.
///
/// With no token configured (loopback binds) every connection passes.
/// Otherwise the frame must be `{"token": "..."}` and the value must match
/// in constant time.
pub fn verify_connect(frame: &str, expected: &Option<String>) -> bool {
    let Some(expected) = expected else {
        return true;
    };

    let presented = serde_json::from_str::<ConnectFrame>(frame)
        .ok()
        .and_then(|f| f.token);

    match presented {
        Some(token) => token_matches(&token, expected),
        None => false,
    }
}

fn token_matches(presented: &str, expected: &str) -> bool {
    let presented = presented.as_bytes();
    let expected = expected.as_bytes();
    presented.len() == expected.len() && bool::from(presented.ct_eq(expected))
}

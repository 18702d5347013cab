//! Boundary sanitizing of untrusted client payloads

use serde_json::Value;
use uuid::Uuid;

use crate::game::physics::{ARENA_HEIGHT, ARENA_WIDTH};
use crate::game::InputUpdate;
use crate::lobby::code::normalize_code;
use crate::ws::protocol::RawInput;

/// Longest display name shown to other players
pub const MAX_NAME_LEN: usize = 20;

/// Largest accepted text frame in bytes
pub const MAX_FRAME_BYTES: usize = 4 * 1024;

/// Loose truthiness: bools as-is, non-zero numbers, and the strings "true"/"1"
pub fn coerce_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => matches!(s.as_str(), "true" | "1"),
        _ => false,
    }
}

/// Pointer coordinate on an axis of length `extent`.
///
/// Malformed or non-finite values fall back to the axis centre; finite values are
/// clamped to one arena-length either side of the board.
pub fn coerce_coord(value: &Value, extent: f32) -> f32 {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed.map(|v| v as f32) {
        Some(v) if v.is_finite() => v.clamp(-extent, 2.0 * extent),
        _ => extent / 2.0,
    }
}

pub fn sanitize_input(raw: &RawInput) -> InputUpdate {
    InputUpdate {
        up: raw.up.as_ref().map(coerce_bool),
        down: raw.down.as_ref().map(coerce_bool),
        left: raw.left.as_ref().map(coerce_bool),
        right: raw.right.as_ref().map(coerce_bool),
        shoot: raw.shoot.as_ref().map(coerce_bool),
        dash: raw.dash.as_ref().map(coerce_bool),
        aim_x: raw.aim_x.as_ref().map(|v| coerce_coord(v, ARENA_WIDTH)),
        aim_y: raw.aim_y.as_ref().map(|v| coerce_coord(v, ARENA_HEIGHT)),
    }
}

/// Join code from whatever the client sent. Empty means nothing usable.
pub fn sanitize_join_code(raw: Option<&Value>) -> String {
    match raw {
        Some(Value::String(s)) => normalize_code(s),
        Some(Value::Number(n)) => normalize_code(&n.to_string()),
        _ => String::new(),
    }
}

/// Trimmed, length-capped display name with a generated fallback
pub fn sanitize_display_name(raw: Option<&str>, account_id: &Uuid) -> String {
    let name: String = raw
        .map(str::trim)
        .unwrap_or_default()
        .chars()
        .take(MAX_NAME_LEN)
        .collect();
    let name = name.trim_end().to_string();
    if name.is_empty() {
        format!("Player_{}", &account_id.simple().to_string()[..8])
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bool_coercion() {
        assert!(coerce_bool(&json!(true)));
        assert!(coerce_bool(&json!(1)));
        assert!(coerce_bool(&json!(-0.5)));
        assert!(coerce_bool(&json!("true")));
        assert!(coerce_bool(&json!("1")));
        assert!(!coerce_bool(&json!(0)));
        assert!(!coerce_bool(&json!("yes")));
        assert!(!coerce_bool(&json!([true])));
        assert!(!coerce_bool(&json!({})));
    }

    #[test]
    fn test_coordinates_clamped_or_defaulted() {
        assert_eq!(coerce_coord(&json!(300.5), ARENA_WIDTH), 300.5);
        assert_eq!(coerce_coord(&json!("250"), ARENA_WIDTH), 250.0);
        assert_eq!(coerce_coord(&json!(1e9), ARENA_WIDTH), 2.0 * ARENA_WIDTH);
        assert_eq!(coerce_coord(&json!(-1e9), ARENA_HEIGHT), -ARENA_HEIGHT);
        assert_eq!(coerce_coord(&json!("NaN"), ARENA_WIDTH), ARENA_WIDTH / 2.0);
        assert_eq!(coerce_coord(&json!("inf"), ARENA_HEIGHT), ARENA_HEIGHT / 2.0);
        assert_eq!(coerce_coord(&json!("abc"), ARENA_WIDTH), ARENA_WIDTH / 2.0);
        assert_eq!(coerce_coord(&json!(null), ARENA_WIDTH), ARENA_WIDTH / 2.0);
    }

    #[test]
    fn test_input_keeps_absent_fields_absent() {
        let raw: RawInput =
            serde_json::from_value(json!({ "up": 1, "aim_x": "12", "extra": "ignored" })).unwrap();
        let update = sanitize_input(&raw);
        assert_eq!(update.up, Some(true));
        assert_eq!(update.aim_x, Some(12.0));
        assert_eq!(update.down, None);
        assert_eq!(update.dash, None);
        assert_eq!(update.aim_y, None);
    }

    #[test]
    fn test_join_code_sanitizing() {
        assert_eq!(sanitize_join_code(Some(&json!(" ab-c2de9 "))), "ABC2DE");
        assert_eq!(sanitize_join_code(Some(&json!(234567))), "234567");
        assert_eq!(sanitize_join_code(Some(&json!(["ABCDEF"]))), "");
        assert_eq!(sanitize_join_code(None), "");
    }

    #[test]
    fn test_display_name() {
        let id = Uuid::parse_str("0f1e2d3c-4b5a-6978-8796-a5b4c3d2e1f0").unwrap();
        assert_eq!(sanitize_display_name(Some("  Ada  "), &id), "Ada");
        assert_eq!(
            sanitize_display_name(Some("abcdefghijklmnopqrstuvwxyz"), &id),
            "abcdefghijklmnopqrst"
        );
        assert_eq!(sanitize_display_name(Some("   "), &id), "Player_0f1e2d3c");
        assert_eq!(sanitize_display_name(None, &id), "Player_0f1e2d3c");
    }
}

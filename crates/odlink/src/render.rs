//! Plain-text rendering of endpoint trees, values and error registers

use odlink_core::{flag_hint, AxisState, Endpoint, EndpointKind, EndpointTree, ErrorRegisters, ScalarValue};
use std::fmt::Write;

fn describe(endpoint: &Endpoint) -> String {
    match endpoint.kind {
        EndpointKind::Object => format!("{}/", endpoint.name),
        kind => {
            let mut line = format!("{} [{}]", endpoint.name, kind);
            if let Some(id) = endpoint.id {
                let _ = write!(line, " #{}", id);
            }
            if endpoint.readonly && !endpoint.is_function() {
                line.push_str(" (read-only)");
            }
            line
        }
    }
}

/// Indented tree listing with kinds, ids and read-only markers
pub fn render_tree(tree: &EndpointTree) -> String {
    let mut out = String::new();
    for (depth, endpoint) in tree.walk() {
        let _ = writeln!(out, "{:indent$}{}", "", describe(endpoint), indent = depth * 2);
    }
    out
}

/// A value as shown to the user; axis states get their name appended
pub fn render_value(identifier: &str, value: &ScalarValue) -> String {
    match value {
        ScalarValue::Uint32(raw) if AxisState::applies_to(identifier) => match AxisState::from_u32(*raw) {
            Some(state) => format!("{} ({})", raw, state),
            None => raw.to_string(),
        },
        _ => value.to_string(),
    }
}

pub fn render_errors(errors: &ErrorRegisters) -> String {
    let active = errors.active();
    if active.is_empty() {
        return "No errors\n".to_string();
    }

    let mut out = String::new();
    for (register, value, flags) in active {
        let _ = writeln!(out, "{} = 0x{:08X}", register.identifier(), value);
        for flag in flags {
            match flag_hint(flag) {
                Some(hint) => {
                    let _ = writeln!(out, "  {} ({})", flag, hint);
                }
                None => {
                    let _ = writeln!(out, "  {}", flag);
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use odlink_core::{parse_schema, ErrorRegister, ErrorSource};

    #[test]
    fn test_render_tree() {
        let schema = r#"[
            {"name": "vbus_voltage", "id": 1, "type": "float", "access": "r"},
            {"name": "axis0", "type": "object", "members": [
                {"name": "requested_state", "id": 2, "type": "uint32", "access": "rw"},
                {"name": "clear_errors", "id": 3, "type": "function", "inputs": [], "outputs": []}
            ]}
        ]"#;
        let tree = parse_schema(schema, 0).unwrap();

        assert_eq!(
            render_tree(&tree),
            "vbus_voltage [float] #1 (read-only)\n\
             axis0/\n\
             \x20 requested_state [uint32] #2\n\
             \x20 clear_errors [function] #3\n"
        );
    }

    #[test]
    fn test_render_axis_state() {
        assert_eq!(
            render_value("axis0.current_state", &ScalarValue::Uint32(7)),
            "7 (AXIS_STATE_CLOSED_LOOP_CONTROL)"
        );
        assert_eq!(
            render_value("axis1.requested_state", &ScalarValue::Uint32(8)),
            "8 (AXIS_STATE_LOCKIN_SPIN)"
        );
        assert_eq!(render_value("axis0.current_state", &ScalarValue::Uint32(99)), "99");
        assert_eq!(render_value("axis0.error", &ScalarValue::Uint32(8)), "8");
        assert_eq!(render_value("vbus_voltage", &ScalarValue::Float(24.0)), "24.0000");
    }

    #[test]
    fn test_render_errors() {
        let mut errors = ErrorRegisters::default();
        assert_eq!(render_errors(&errors), "No errors\n");

        let register = ErrorRegister {
            axis: 1,
            source: ErrorSource::Axis,
        };
        errors.set(register, 0x1);
        let text = render_errors(&errors);
        assert!(text.starts_with("axis1.error = 0x00000001\n"));
        assert_eq!(text.lines().count(), 2);
    }
}

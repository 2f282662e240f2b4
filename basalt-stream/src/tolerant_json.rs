//! Best-effort JSON repair for partial `input_json_delta` buffers (spec
//! §4.1). Strict parsing is always attempted first; repair only kicks in on
//! failure, and only ever appends characters — it never reorders or removes
//! anything but a dangling trailing comma.

/// Attempt to parse `buffer` as JSON, falling back to a tolerant repair pass
/// on failure. Returns `None` if even the repaired buffer fails to parse
/// (e.g. the buffer isn't JSON-shaped at all yet).
pub fn tolerant_parse(buffer: &str) -> Option<serde_json::Value> {
    if let Ok(value) = serde_json::from_str(buffer) {
        return Some(value);
    }
    let repaired = repair(buffer);
    serde_json::from_str(&repaired).ok()
}

/// Repair a truncated JSON buffer: strip a dangling trailing comma, close
/// an unterminated string, then close any unterminated arrays/objects in
/// order from innermost to outermost.
fn repair(buffer: &str) -> String {
    let mut s = buffer.trim_end().to_string();
    while s.ends_with(',') {
        s.pop();
        s = s.trim_end().to_string();
    }

    let mut stack = Vec::new();
    let mut in_string = false;
    let mut escape = false;
    for c in s.chars() {
        if in_string {
            if escape {
                escape = false;
            } else if c == '\\' {
                escape = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                stack.pop();
            }
            _ => {}
        }
    }

    if in_string {
        s.push('"');
    }
    while let Some(closer) = stack.pop() {
        s.push(closer);
    }
    s
}

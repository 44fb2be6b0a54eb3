/// Quotes `text` as a JSON string, for use in error messages.
pub fn quote(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| format!("\"{}\"", text))
}

/// Placeholder naming the argument passed down to a member's type.
pub const ARGUMENT: &str = "ARG";

// Naming hooks. The compiler itself keeps raw schema names; consumers pass
// these (or their own) wherever a `name_hook` is accepted.

/// Formats a raw type name as a class identifier (`"Key Group"` -> `"Key_Group"`).
pub fn class_name(name: &str) -> String {
    name.replace([' ', ':'], "_")
}

/// Formats a raw field name as a camelCase member identifier
/// (`"Num Vertices"` -> `"numVertices"`). A backslash becomes member access.
pub fn member_name(name: &str) -> String {
    if name == ARGUMENT {
        return name.to_string();
    }
    let mut out = String::with_capacity(name.len());
    let mut lower = true;
    for c in name.chars() {
        if c == ' ' {
            lower = false;
        } else if c.is_alphanumeric() {
            if lower {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
                lower = true;
            }
        } else if c == '\\' {
            out.push('.');
        } else {
            out.push('_');
            lower = true;
        }
    }
    out
}

/// Formats a name as an upper-case define (`"NiNode"` -> `"NI_NODE"`).
pub fn define_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(c);
        } else if c.is_lowercase() || c.is_numeric() {
            out.extend(c.to_uppercase());
        } else {
            out.push('_');
        }
    }
    out
}

/// Formats an enum option name as an upper-case constant.
pub fn option_name(name: &str) -> String {
    name.to_uppercase().replace([' ', '-', '/', '=', ':'], "_")
}

// Pure predicates on strings: identifiers (table names, keys, usernames) and
// values (anything pushable on the operand stack). Kept free of the regex
// crate since both shapes are simple enough to walk by hand -- the original
// C++ source attempted the same thing with a hand-rolled loop and got it
// wrong (`c < '0' && c > '9'` can never be true, so it accepted any byte);
// we just write the condition the source meant to write.

pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub fn is_value(s: &str) -> bool {
    !s.is_empty() && !s.contains(' ') && !s.contains('\n')
}

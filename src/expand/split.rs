//! IFS word splitting
//!
//! Applied only to the results of expansions in unquoted context.
//! Whitespace IFS characters coalesce and never create empty fields;
//! each non-whitespace IFS character delimits exactly one field.

/// Split expansion output into fields.
pub fn split_fields(text: &str, ifs: &str) -> Vec<String> {
    if ifs.is_empty() {
        // No splitting at all with an empty IFS.
        return if text.is_empty() {
            Vec::new()
        } else {
            vec![text.to_string()]
        };
    }

    let ifs_ws: Vec<char> = ifs.chars().filter(|c| " \t\n".contains(*c)).collect();
    let ifs_other: Vec<char> = ifs.chars().filter(|c| !" \t\n".contains(*c)).collect();

    let chars: Vec<char> = text.chars().collect();
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut have_field = false;
    let mut i = 0;

    // Leading IFS whitespace never opens a field.
    while i < chars.len() && ifs_ws.contains(&chars[i]) {
        i += 1;
    }

    while i < chars.len() {
        let c = chars[i];
        if ifs_ws.contains(&c) {
            // Coalesce whitespace; a following non-ws separator belongs to
            // the same boundary.
            while i < chars.len() && ifs_ws.contains(&chars[i]) {
                i += 1;
            }
            if i < chars.len() && ifs_other.contains(&chars[i]) {
                i += 1;
                while i < chars.len() && ifs_ws.contains(&chars[i]) {
                    i += 1;
                }
            }
            fields.push(std::mem::take(&mut current));
            have_field = false;
            continue;
        }
        if ifs_other.contains(&c) {
            fields.push(std::mem::take(&mut current));
            have_field = false;
            i += 1;
            // Whitespace after a separator is absorbed.
            while i < chars.len() && ifs_ws.contains(&chars[i]) {
                i += 1;
            }
            continue;
        }
        current.push(c);
        have_field = true;
        i += 1;
    }

    if have_field || !current.is_empty() {
        fields.push(current);
    }

    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ifs_coalesces_whitespace() {
        assert_eq!(split_fields("  a  b\tc\n", " \t\n"), vec!["a", "b", "c"]);
    }

    #[test]
    fn empty_input_yields_no_fields() {
        assert!(split_fields("", " \t\n").is_empty());
        assert!(split_fields("   ", " \t\n").is_empty());
    }

    #[test]
    fn non_whitespace_separator_keeps_empty_fields() {
        assert_eq!(split_fields("a::b", ":"), vec!["a", "", "b"]);
        assert_eq!(split_fields(":a", ":"), vec!["", "a"]);
    }

    #[test]
    fn mixed_ifs() {
        // Whitespace around a colon is one boundary.
        assert_eq!(split_fields("a : b", ": "), vec!["a", "b"]);
        assert_eq!(split_fields("a:b c", ": "), vec!["a", "b", "c"]);
    }

    #[test]
    fn empty_ifs_disables_splitting() {
        assert_eq!(split_fields("a b c", ""), vec!["a b c"]);
    }

    #[test]
    fn trailing_non_ws_separator_drops_final_empty_field() {
        // `a:` splits to one field, like bash.
        assert_eq!(split_fields("a:", ":"), vec!["a"]);
        assert_eq!(split_fields("a::", ":"), vec!["a", ""]);
    }
}

use crate::error::{ConfigError, Result};

/// Expands a comma-separated path list with `{a,b,c}` brace alternatives
/// into its cartesian-product list of concrete paths.
///
/// `parse("a/b,dd/{f,g,e},/x/zz")` yields
/// `["a/b", "dd/f", "dd/g", "dd/e", "/x/zz"]`. Unbalanced braces are
/// rejected.
pub fn expand_path_list(list: &str) -> Result<Vec<String>> {
    check_balanced(list)?;
    let mut out = Vec::new();
    for segment in split_top_level(list, ',')? {
        out.extend(expand_braces(&segment)?);
    }
    Ok(out)
}

fn check_balanced(s: &str) -> Result<()> {
    let mut depth: i32 = 0;
    for c in s.chars() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth < 0 {
                    return Err(ConfigError::UnbalancedBraces(s.to_string()));
                }
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(ConfigError::UnbalancedBraces(s.to_string()));
    }
    Ok(())
}

/// Splits on `delim` at brace depth zero only.
fn split_top_level(s: &str, delim: char) -> Result<Vec<String>> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();
    for c in s.chars() {
        match c {
            '{' => {
                depth += 1;
                current.push(c);
            }
            '}' => {
                depth -= 1;
                current.push(c);
            }
            c if c == delim && depth == 0 => {
                parts.push(std::mem::take(&mut current));
            }
            c => current.push(c),
        }
    }
    parts.push(current);
    Ok(parts)
}

fn find_brace_group(s: &str) -> Result<Option<(usize, usize)>> {
    let bytes: Vec<char> = s.chars().collect();
    let Some(start) = bytes.iter().position(|&c| c == '{') else {
        return Ok(None);
    };
    let mut depth = 0i32;
    for (i, &c) in bytes.iter().enumerate().skip(start) {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(Some((start, i)));
                }
            }
            _ => {}
        }
    }
    Err(ConfigError::UnbalancedBraces(s.to_string()))
}

fn expand_braces(s: &str) -> Result<Vec<String>> {
    match find_brace_group(s)? {
        None => Ok(vec![s.to_string()]),
        Some((start, end)) => {
            let chars: Vec<char> = s.chars().collect();
            let prefix: String = chars[..start].iter().collect();
            let content: String = chars[start + 1..end].iter().collect();
            let suffix: String = chars[end + 1..].iter().collect();

            let mut results = Vec::new();
            for alt in split_top_level(&content, ',')? {
                let combined = format!("{prefix}{alt}{suffix}");
                results.extend(expand_braces(&combined)?);
            }
            Ok(results)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_literal_example() {
        let got = expand_path_list("a/b,dd/{f,g,e},/x/zz").unwrap();
        assert_eq!(got, vec!["a/b", "dd/f", "dd/g", "dd/e", "/x/zz"]);
    }

    #[test]
    fn passes_through_plain_list() {
        let got = expand_path_list("one,two,three").unwrap();
        assert_eq!(got, vec!["one", "two", "three"]);
    }

    #[test]
    fn expands_multiple_groups_in_one_segment() {
        let got = expand_path_list("a{1,2}/b{x,y}").unwrap();
        assert_eq!(got, vec!["a1/bx", "a1/by", "a2/bx", "a2/by"]);
    }

    #[test]
    fn rejects_unbalanced_braces() {
        assert!(expand_path_list("dd/{f,g,e").is_err());
        assert!(expand_path_list("dd/f,g,e}").is_err());
    }

    #[test]
    fn single_path_no_braces() {
        assert_eq!(expand_path_list("a/b").unwrap(), vec!["a/b"]);
    }
}

// I'll be doing empty string to None in the DTO conversion
// using plain old function here:
pub fn empty_string_to_none(value: Option<String>) -> Option<String> {
  match value {
    Some(s) => if s.trim().is_empty()
      { None } else { Some(s) },
    None => None
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn blank_strings_become_none() {
    assert_eq!(None, empty_string_to_none(Some("".to_string())));
    assert_eq!(None, empty_string_to_none(Some("  ".to_string())));
    assert_eq!(Some("a".to_string()), empty_string_to_none(Some("a".to_string())));
    assert_eq!(None, empty_string_to_none(None));
  }
}

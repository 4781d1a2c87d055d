// Extensions the category featured images are allowed to have.
const IMAGE_EXTENSIONS: [&'static str; 4] = [".jpg", ".jpeg", ".png", ".gif"];

pub fn is_valid_image_url(url: &str) -> bool {
  if url.is_empty() {
    return false;
  }
  let lower = url.to_lowercase();
  IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

// Counting chars and not bytes, titles can be anything.
pub fn exceeds_length(value: &str, max: usize) -> bool {
  value.chars().count() > max
}

// Trims and refuses blank values.
pub fn required_text(value: &str) -> Option<String> {
  let trimmed = value.trim();
  if trimmed.is_empty() {
    None
  } else {
    Some(trimmed.to_string())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn image_urls_need_an_image_extension() {
    assert!(is_valid_image_url("https://cdn.example.org/cat.JPG"));
    assert!(is_valid_image_url("/static/a.gif"));
    assert!(!is_valid_image_url("https://example.org/cat.svg"));
    assert!(!is_valid_image_url(""));
  }

  #[test]
  fn length_is_counted_in_chars() {
    assert!(!exceeds_length("ééé", 3));
    assert!(exceeds_length("abcd", 3));
  }

  #[test]
  fn blank_text_is_refused() {
    assert_eq!(None, required_text("   "));
    assert_eq!(Some("Hello".to_string()), required_text(" Hello "));
  }
}

use regex_lite::Regex;
use std::sync::LazyLock;

static DISALLOWED: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"[^a-z0-9\s-]").expect("static pattern"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("static pattern"));

const FOLDS: &[(&str, char)] = &[
  ("àáảãạăằắẳẵặâầấẩẫậäåāą", 'a'),
  ("çćč", 'c'),
  ("đď", 'd'),
  ("èéẻẽẹêềếểễệëēęě", 'e'),
  ("ìíỉĩịîïī", 'i'),
  ("ñńň", 'n'),
  ("òóỏõọôồốổỗộơờớởỡợöøō", 'o'),
  ("šś", 's'),
  ("ùúủũụưừứửữựûüūů", 'u'),
  ("ỳýỷỹỵÿ", 'y'),
  ("žźż", 'z'),
];

fn fold(c: char) -> char {
  FOLDS
    .iter()
    .find(|(accented, _)| accented.contains(c))
    .map_or(c, |(_, base)| *base)
}

/// Folder-safe form of a profile name, used for the Odoo `localPath`.
/// `"Hồ Sơ Đặng"` becomes `"ho_so_dang"`.
pub fn slugify(name: &str) -> String {
  let folded: String = name.to_lowercase().chars().map(fold).collect();
  let trimmed = folded.trim();
  let cleaned = DISALLOWED.replace_all(trimmed, "");
  WHITESPACE.replace_all(&cleaned, "_").into_owned()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_vietnamese_names() {
    assert_eq!(slugify("Hồ Sơ Đặng Văn A"), "ho_so_dang_van_a");
    assert_eq!(slugify("Tài khoản Shopee Hà Nội"), "tai_khoan_shopee_ha_noi");
    assert_eq!(slugify("NGƯỜI DÙNG Ưu Tiên"), "nguoi_dung_uu_tien");
  }

  #[test]
  fn test_latin1_and_symbols() {
    assert_eq!(slugify("Café Münster"), "cafe_munster");
    assert_eq!(slugify("  Shop--Hà Nội #1 "), "shop--ha_noi_1");
    assert_eq!(slugify("a\t\tb   c"), "a_b_c");
  }

  #[test]
  fn test_nothing_left() {
    assert_eq!(slugify("!!!"), "");
    assert_eq!(slugify(""), "");
  }
}

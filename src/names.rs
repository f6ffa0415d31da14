//! 文件名清洗与自然排序比较。

use std::cmp::Ordering;
use std::iter::Peekable;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// 标点与符号的排序位次，靠前的先排。
const PUNCTUATION_ORDER: &str = "_-,;:!?.'\"()[]{}@*/\\&#%`^+<=>|~$";

/// 将 `[A-Za-z0-9.\-_]` 以外的字符替换为 `_`。
///
/// 按 UTF-16 码元计数：BMP 以外的字符（如 emoji）替换为两个 `_`。
pub fn sanitize_file_name(raw: &str) -> String {
    let mut sanitized = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
            sanitized.push(c);
        } else {
            sanitized.extend(std::iter::repeat_n('_', c.len_utf16()));
        }
    }
    sanitized
}

/// 自然排序：忽略大小写与重音，连续数字按数值比较。
///
/// 比较前先做 NFD 分解并去掉组合附加符号，因此 "Étude" 与 "etude" 相等。
/// 数字串忽略前导零，长度不限，不会溢出。
/// 字符类别的先后为：空白 < 标点符号 < 数字 < 字母，标点内部按 `_ - , ; : ! ? .` 等固定顺序。
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = fold(a).peekable();
    let mut right = fold(b).peekable();

    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let lhs = take_digits(&mut left);
                let rhs = take_digits(&mut right);
                let ordering = compare_numeric(&lhs, &rhs);
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            (Some(x), Some(y)) => {
                let ordering = collation_key(x).cmp(&collation_key(y));
                if ordering != Ordering::Equal {
                    return ordering;
                }
                left.next();
                right.next();
            }
        }
    }
}

fn fold(value: &str) -> impl Iterator<Item = char> + '_ {
    value
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
}

fn collation_key(c: char) -> (u8, u32) {
    if c.is_whitespace() {
        return (0, c as u32);
    }
    if let Some(position) = PUNCTUATION_ORDER.find(c) {
        return (1, position as u32);
    }
    if c.is_ascii_digit() {
        return (2, c as u32);
    }
    if !c.is_alphanumeric() {
        return (1, 0x100 + c as u32);
    }
    (3, c as u32)
}

fn take_digits<I: Iterator<Item = char>>(chars: &mut Peekable<I>) -> String {
    let mut digits = String::new();
    while let Some(c) = chars.next_if(char::is_ascii_digit) {
        digits.push(c);
    }
    digits
}

fn compare_numeric(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

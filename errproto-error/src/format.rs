//! printf-style message expansion
//!
//! Templates use the familiar `%[flags][width][.precision]verb` syntax.
//! Expansion never fails: a verb that does not fit its argument, a missing
//! argument, or surplus arguments are rendered as visible markers so the
//! message still reaches the operator.
//!
//! | Situation        | Rendering            |
//! |------------------|----------------------|
//! | wrong type       | `%!d(string=abc)`    |
//! | missing argument | `%!d(MISSING)`       |
//! | surplus argument | `%!(EXTRA int=5)`    |
//! | unknown verb     | `%!z(int=5)`         |
//! | trailing `%`     | `%!(NOVERB)`         |
//! | bad `*` or width | `%!(BADWIDTH)`       |
//! | bad precision    | `%!(BADPREC)`        |
//!
//! `*` in place of a width or precision takes it from the next argument,
//! which must be an integer. A negative `*` width pads on the right.
//! Widths and precisions above one million are rejected.

use crate::Arg;
use std::fmt::{self, Write};

const MAX_WIDTH: usize = 1_000_000;

/// Expand `template` with `args` into a new string.
pub fn sprintf(template: &str, args: &[Arg]) -> String {
    let mut out = String::with_capacity(template.len() + 16);
    // Writing into a String cannot fail.
    let _ = write_printf(&mut out, template, args);
    out
}

/// Expand `template` with `args` into any [`fmt::Write`] sink.
pub fn write_printf<W: Write + ?Sized>(out: &mut W, template: &str, args: &[Arg]) -> fmt::Result {
    let mut chars = template.chars().peekable();
    let mut next_arg = 0;

    while let Some(c) = chars.next() {
        if c != '%' {
            out.write_char(c)?;
            continue;
        }

        let mut spec = Spec::default();
        while let Some(&flag) = chars.peek() {
            match flag {
                '-' => spec.minus = true,
                '+' => spec.plus = true,
                '#' => spec.sharp = true,
                ' ' => spec.space = true,
                '0' => spec.zero = true,
                _ => break,
            }
            chars.next();
        }
        if chars.peek() == Some(&'*') {
            chars.next();
            match int_from_arg(args, &mut next_arg) {
                Some(w) => {
                    if w < 0 {
                        spec.minus = true;
                    }
                    spec.width = Some(w.unsigned_abs() as usize);
                }
                None => out.write_str("%!(BADWIDTH)")?,
            }
        } else {
            match take_number(&mut chars) {
                Some(w) if w > MAX_WIDTH => out.write_str("%!(BADWIDTH)")?,
                w => spec.width = w,
            }
        }
        if chars.peek() == Some(&'.') {
            chars.next();
            if chars.peek() == Some(&'*') {
                chars.next();
                match int_from_arg(args, &mut next_arg) {
                    Some(p) if p >= 0 => spec.prec = Some(p as usize),
                    _ => out.write_str("%!(BADPREC)")?,
                }
            } else {
                match take_number(&mut chars) {
                    Some(p) if p > MAX_WIDTH => out.write_str("%!(BADPREC)")?,
                    p => spec.prec = Some(p.unwrap_or(0)),
                }
            }
        }

        let Some(verb) = chars.next() else {
            out.write_str("%!(NOVERB)")?;
            break;
        };
        if verb == '%' {
            out.write_char('%')?;
            continue;
        }
        spec.verb = verb;

        match args.get(next_arg) {
            Some(arg) => {
                next_arg += 1;
                match format_arg(&spec, arg) {
                    Some(s) => out.write_str(&pad(s, &spec))?,
                    None => write!(out, "%!{}({}={})", verb, arg.type_name(), arg)?,
                }
            }
            None => write!(out, "%!{}(MISSING)", verb)?,
        }
    }

    if next_arg < args.len() {
        out.write_str("%!(EXTRA ")?;
        for (i, arg) in args[next_arg..].iter().enumerate() {
            if i > 0 {
                out.write_str(", ")?;
            }
            write!(out, "{}={}", arg.type_name(), arg)?;
        }
        out.write_char(')')?;
    }
    Ok(())
}

#[derive(Debug, Default)]
struct Spec {
    minus: bool,
    plus: bool,
    sharp: bool,
    space: bool,
    zero: bool,
    width: Option<usize>,
    prec: Option<usize>,
    verb: char,
}

fn take_number(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Option<usize> {
    let mut n: Option<usize> = None;
    while let Some(d) = chars.peek().and_then(|c| c.to_digit(10)) {
        n = Some(n.unwrap_or(0).saturating_mul(10).saturating_add(d as usize));
        chars.next();
    }
    n
}

/// Take a `*` width or precision from the next argument.
///
/// The argument is consumed even when it is not a usable integer.
fn int_from_arg(args: &[Arg], next_arg: &mut usize) -> Option<i64> {
    let arg = args.get(*next_arg)?;
    *next_arg += 1;
    let n = match *arg {
        Arg::Int(i) => i,
        Arg::Uint(u) => i64::try_from(u).ok()?,
        _ => return None,
    };
    (n.unsigned_abs() <= MAX_WIDTH as u64).then_some(n)
}

/// Format one argument, or `None` when the verb does not apply to it.
fn format_arg(spec: &Spec, arg: &Arg) -> Option<Formatted> {
    match arg {
        Arg::Bool(b) => match spec.verb {
            'v' | 't' => Some(Formatted::text(b.to_string())),
            _ => None,
        },
        Arg::Int(i) => format_integer(spec, *i < 0, i.unsigned_abs()),
        Arg::Uint(u) => format_integer(spec, false, *u),
        Arg::Float(x) => format_float(spec, *x),
        Arg::Str(s) => format_str(spec, s),
    }
}

/// A rendered value split so that zero padding can go between the sign or
/// radix prefix and the digits.
struct Formatted {
    head: String,
    body: String,
    zero_pad: bool,
}

impl Formatted {
    fn text(body: String) -> Self {
        Self {
            head: String::new(),
            body,
            zero_pad: false,
        }
    }

    fn number(head: String, body: String) -> Self {
        Self {
            head,
            body,
            zero_pad: true,
        }
    }
}

fn pad(f: Formatted, spec: &Spec) -> String {
    let len = f.head.chars().count() + f.body.chars().count();
    let width = spec.width.unwrap_or(0);
    if len >= width {
        return f.head + &f.body;
    }

    let fill = width - len;
    if spec.minus {
        format!("{}{}{}", f.head, f.body, " ".repeat(fill))
    } else if spec.zero && f.zero_pad {
        format!("{}{}{}", f.head, "0".repeat(fill), f.body)
    } else {
        format!("{}{}{}", " ".repeat(fill), f.head, f.body)
    }
}

fn sign(spec: &Spec, negative: bool) -> &'static str {
    if negative {
        "-"
    } else if spec.plus {
        "+"
    } else if spec.space {
        " "
    } else {
        ""
    }
}

fn format_integer(spec: &Spec, negative: bool, magnitude: u64) -> Option<Formatted> {
    let (digits, prefix) = match spec.verb {
        'v' | 'd' => (magnitude.to_string(), ""),
        'b' => (format!("{:b}", magnitude), "0b"),
        'o' => (format!("{:o}", magnitude), "0"),
        'x' => (format!("{:x}", magnitude), "0x"),
        'X' => (format!("{:X}", magnitude), "0X"),
        'c' => {
            if negative {
                return Some(Formatted::text(char::REPLACEMENT_CHARACTER.to_string()));
            }
            return Some(Formatted::text(to_char(magnitude).to_string()));
        }
        'q' => {
            if negative {
                return Some(Formatted::text("'\u{FFFD}'".to_string()));
            }
            return Some(Formatted::text(format!("'{}'", to_char(magnitude).escape_default())));
        }
        'U' => {
            if negative {
                return None;
            }
            return Some(Formatted::text(format!("U+{:04X}", magnitude)));
        }
        _ => return None,
    };

    let mut body = match spec.prec {
        Some(0) if magnitude == 0 => String::new(),
        Some(p) if digits.len() < p => format!("{}{}", "0".repeat(p - digits.len()), digits),
        _ => digits,
    };
    let mut head = sign(spec, negative).to_string();
    if spec.sharp {
        if spec.verb == 'o' {
            if !body.starts_with('0') {
                body.insert(0, '0');
            }
        } else {
            head.push_str(prefix);
        }
    }

    let mut f = Formatted::number(head, body);
    // An explicit precision overrides the zero flag, as in C.
    f.zero_pad = spec.prec.is_none();
    Some(f)
}

fn to_char(code: u64) -> char {
    u32::try_from(code)
        .ok()
        .and_then(char::from_u32)
        .unwrap_or(char::REPLACEMENT_CHARACTER)
}

fn format_str(spec: &Spec, s: &str) -> Option<Formatted> {
    let truncated: &str = match spec.prec {
        Some(p) => match s.char_indices().nth(p) {
            Some((idx, _)) => &s[..idx],
            None => s,
        },
        None => s,
    };

    let body = match spec.verb {
        'v' | 's' => truncated.to_string(),
        'q' => format!("{:?}", truncated),
        'x' => hex_bytes(truncated.as_bytes(), false),
        'X' => hex_bytes(truncated.as_bytes(), true),
        _ => return None,
    };
    Some(Formatted::text(body))
}

fn hex_bytes(bytes: &[u8], upper: bool) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        if upper {
            let _ = write!(out, "{:02X}", b);
        } else {
            let _ = write!(out, "{:02x}", b);
        }
    }
    out
}

fn format_float(spec: &Spec, x: f64) -> Option<Formatted> {
    if !matches!(spec.verb, 'v' | 'e' | 'E' | 'f' | 'F' | 'g' | 'G') {
        return None;
    }

    if x.is_nan() {
        let head = if spec.plus { "+" } else if spec.space { " " } else { "" };
        return Some(Formatted::text(format!("{}NaN", head)));
    }
    if x.is_infinite() {
        let head = if x < 0.0 { "-" } else if spec.plus { "+" } else if spec.space { " " } else { "+" };
        return Some(Formatted::text(format!("{}Inf", head)));
    }

    let negative = x.is_sign_negative() && x != 0.0;
    let x = x.abs();
    let body = match spec.verb {
        'f' | 'F' => format!("{:.*}", spec.prec.unwrap_or(6), x),
        'e' | 'E' => {
            let s = format!("{:.*e}", spec.prec.unwrap_or(6), x);
            let (mantissa, exp) = split_exp(&s);
            exp_form(mantissa, exp, spec.verb == 'E')
        }
        _ => general(x, spec.prec, spec.verb == 'G'),
    };
    Some(Formatted::number(sign(spec, negative).to_string(), body))
}

/// Split Rust's `1.5e3` exponent notation into mantissa and exponent.
fn split_exp(s: &str) -> (&str, i32) {
    match s.split_once('e') {
        Some((m, e)) => (m, e.parse().unwrap_or(0)),
        None => (s, 0),
    }
}

/// Render a mantissa with a signed, two-digit-minimum exponent (`1.5e+03`).
fn exp_form(mantissa: &str, exp: i32, upper: bool) -> String {
    let e = if upper { 'E' } else { 'e' };
    let sign = if exp < 0 { '-' } else { '+' };
    format!("{}{}{}{:02}", mantissa, e, sign, exp.unsigned_abs())
}

/// `%g` / `%v`: exponent form for small or large exponents, plain otherwise.
fn general(x: f64, prec: Option<usize>, upper: bool) -> String {
    let shortest = prec.is_none();
    let rendered = match prec {
        None => format!("{:e}", x),
        Some(p) => format!("{:.*e}", p.max(1) - 1, x),
    };
    let (mantissa, exp) = split_exp(&rendered);
    let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();
    let digits = match digits.trim_end_matches('0') {
        "" => "0".to_string(),
        trimmed => trimmed.to_string(),
    };
    let nd = digits.len() as i64;
    let dp = exp as i64 + 1;

    let mut eprec = match prec {
        None => 6,
        Some(p) => p.max(1) as i64,
    };
    if !shortest && eprec > nd && nd >= dp {
        eprec = nd;
    }

    let mut p = prec.map(|p| p.max(1) as i64).unwrap_or(nd);
    if (exp as i64) < -4 || exp as i64 >= eprec {
        if p > nd {
            p = nd;
        }
        let mut mantissa = digits[..1].to_string();
        if p > 1 {
            mantissa.push('.');
            mantissa.push_str(&digits[1..p as usize]);
        }
        return exp_form(&mantissa, exp, upper);
    }

    if p > dp {
        p = nd;
    }
    fixed_from_digits(&digits, dp, (p - dp).max(0) as usize)
}

/// Lay out significant `digits` with `dp` integer digits and `frac` decimals.
fn fixed_from_digits(digits: &str, dp: i64, frac: usize) -> String {
    let bytes = digits.as_bytes();
    let digit_at = |i: i64| -> char {
        if i >= 0 && (i as usize) < bytes.len() {
            bytes[i as usize] as char
        } else {
            '0'
        }
    };

    let mut out = String::new();
    if dp > 0 {
        for i in 0..dp {
            out.push(digit_at(i));
        }
    } else {
        out.push('0');
    }
    if frac > 0 {
        out.push('.');
        for i in 0..frac as i64 {
            out.push(digit_at(dp + i));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;

    #[test]
    fn test_plain_substitution() {
        assert_eq!(sprintf("duplicate key name %s", &args!["idx1"]), "duplicate key name idx1");
        assert_eq!(sprintf("Region %d is unavailable", &args![5]), "Region 5 is unavailable");
        assert_eq!(sprintf("%v-%v-%v", &args![true, 7u8, "x"]), "true-7-x");
        assert_eq!(sprintf("100%%", &args![]), "100%");
    }

    #[test]
    fn test_integer_verbs() {
        assert_eq!(sprintf("%x %X %o %b", &args![255, 255, 8, 5]), "ff FF 10 101");
        assert_eq!(sprintf("%#x %#o %#b", &args![255, 8, 5]), "0xff 010 0b101");
        assert_eq!(sprintf("%c%c", &args![72, 105]), "Hi");
        assert_eq!(sprintf("%q", &args![97]), "'a'");
        assert_eq!(sprintf("%U", &args![0x1F600]), "U+1F600");
    }

    #[test]
    fn test_width_and_flags() {
        assert_eq!(sprintf("[%5d]", &args![42]), "[   42]");
        assert_eq!(sprintf("[%-5d]", &args![42]), "[42   ]");
        assert_eq!(sprintf("[%05d]", &args![-42]), "[-0042]");
        assert_eq!(sprintf("[%+d]", &args![42]), "[+42]");
        assert_eq!(sprintf("[%.3d]", &args![7]), "[007]");
        assert_eq!(sprintf("[%6s]", &args!["ab"]), "[    ab]");
        assert_eq!(sprintf("[%.2s]", &args!["abcdef"]), "[ab]");
    }

    #[test]
    fn test_float_verbs() {
        assert_eq!(sprintf("%f", &args![3.14159]), "3.141590");
        assert_eq!(sprintf("%.2f", &args![3.14159]), "3.14");
        assert_eq!(sprintf("%e", &args![1234.5678]), "1.234568e+03");
        assert_eq!(sprintf("%E", &args![0.00012]), "1.200000E-04");
        assert_eq!(sprintf("%v", &args![1.5]), "1.5");
        assert_eq!(sprintf("%v", &args![1.0]), "1");
        assert_eq!(sprintf("%v", &args![123456.0]), "123456");
        assert_eq!(sprintf("%v", &args![1000000.0]), "1e+06");
        assert_eq!(sprintf("%v", &args![0.00001]), "1e-05");
        assert_eq!(sprintf("%.3g", &args![3.14159]), "3.14");
        assert_eq!(sprintf("%g", &args![100.0]), "100");
        assert_eq!(sprintf("%08.3f", &args![-3.14159]), "-003.142");
    }

    #[test]
    fn test_float_special_values() {
        assert_eq!(sprintf("%v", &args![f64::NAN]), "NaN");
        assert_eq!(sprintf("%f", &args![f64::INFINITY]), "+Inf");
        assert_eq!(sprintf("%f", &args![f64::NEG_INFINITY]), "-Inf");
    }

    #[test]
    fn test_string_verbs() {
        assert_eq!(sprintf("%q", &args!["a\"b"]), "\"a\\\"b\"");
        assert_eq!(sprintf("%x", &args!["hi"]), "6869");
        assert_eq!(sprintf("%X", &args!["hi"]), "6869");
    }

    #[test]
    fn test_wrong_type_marker() {
        assert_eq!(sprintf("Region %d is down", &args!["r1"]), "Region %!d(string=r1) is down");
        assert_eq!(sprintf("%s", &args![5]), "%!s(int=5)");
        assert_eq!(sprintf("%d", &args![2.5]), "%!d(float64=2.5)");
        assert_eq!(sprintf("%z", &args![true]), "%!z(bool=true)");
    }

    #[test]
    fn test_missing_and_extra_markers() {
        assert_eq!(sprintf("%s and %s", &args!["a"]), "a and %!s(MISSING)");
        assert_eq!(sprintf("no verbs", &args![5, "x"]), "no verbs%!(EXTRA int=5, string=x)");
        assert_eq!(sprintf("%d%", &args![1]), "1%!(NOVERB)");
    }

    #[test]
    fn test_star_width_and_precision() {
        assert_eq!(sprintf("[%*d]", &args![5, 42]), "[   42]");
        assert_eq!(sprintf("[%*d]", &args![-5, 42]), "[42   ]");
        assert_eq!(sprintf("[%-*d]", &args![5u8, 42]), "[42   ]");
        assert_eq!(sprintf("[%.*f]", &args![2, 3.14159]), "[3.14]");
        assert_eq!(sprintf("[%*.*s]", &args![4, 2, "abcdef"]), "[  ab]");
    }

    #[test]
    fn test_bad_star_arguments() {
        assert_eq!(sprintf("%*d", &args!["x", 5]), "%!(BADWIDTH)5");
        assert_eq!(sprintf("%*d", &args![2_000_000, 7]), "%!(BADWIDTH)7");
        assert_eq!(sprintf("%.*d", &args![-1, 5]), "%!(BADPREC)5");
        assert_eq!(sprintf("%*d", &args![]), "%!(BADWIDTH)%!d(MISSING)");
    }

    #[test]
    fn test_oversized_width_and_precision() {
        assert_eq!(sprintf("%99999999999999999999d", &args![1]), "%!(BADWIDTH)1");
        assert_eq!(sprintf("%1000001s", &args!["a"]), "%!(BADWIDTH)a");
        assert_eq!(sprintf("%.99999999999999999999d", &args![7]), "%!(BADPREC)7");
        assert_eq!(sprintf("%.99999999999999999999f", &args![1.5]), "%!(BADPREC)1.500000");
        assert_eq!(sprintf("[%1000000d]", &args![1]).len(), 1_000_002);
    }

    #[test]
    fn test_unicode_literals_pass_through() {
        assert_eq!(sprintf("région %s ✓", &args!["ü"]), "région ü ✓");
    }
}

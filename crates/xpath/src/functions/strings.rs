use itertools::Itertools;

use super::{DefaultArg, FunctionRegistry, arg_number, arg_string};
use crate::value::{Value, round_half_up};

pub(super) fn register(reg: &mut FunctionRegistry) {
    reg.register_defaulted("string", 1, Some(1), DefaultArg::ContextNodeSet, |_, args| {
        Ok(Value::String(arg_string(args, 0)))
    });
    reg.register_fn("concat", 2, None, |_, args| {
        Ok(Value::String(args.iter().map(Value::string_value).collect()))
    });
    reg.register_fn("starts-with", 2, Some(2), |_, args| {
        Ok(Value::Boolean(arg_string(args, 0).starts_with(&arg_string(args, 1))))
    });
    reg.register_fn("contains", 2, Some(2), |_, args| {
        Ok(Value::Boolean(arg_string(args, 0).contains(&arg_string(args, 1))))
    });
    reg.register_fn("substring-before", 2, Some(2), |_, args| {
        let s = arg_string(args, 0);
        let needle = arg_string(args, 1);
        Ok(Value::String(s.find(&needle).map(|i| s[..i].to_string()).unwrap_or_default()))
    });
    reg.register_fn("substring-after", 2, Some(2), |_, args| {
        let s = arg_string(args, 0);
        let needle = arg_string(args, 1);
        Ok(Value::String(s.find(&needle).map(|i| s[i + needle.len()..].to_string()).unwrap_or_default()))
    });
    reg.register_fn("substring", 2, Some(3), |_, args| {
        let s = arg_string(args, 0);
        let start = round_half_up(arg_number(args, 1));
        let length = if args.len() > 2 { Some(round_half_up(arg_number(args, 2))) } else { None };
        Ok(Value::String(substring(&s, start, length)))
    });
    reg.register_defaulted("string-length", 1, Some(1), DefaultArg::ContextString, |_, args| {
        Ok(Value::Number(arg_string(args, 0).chars().count() as f64))
    });
    reg.register_defaulted("normalize-space", 1, Some(1), DefaultArg::ContextString, |_, args| {
        Ok(Value::String(arg_string(args, 0).split_whitespace().join(" ")))
    });
    reg.register_fn("translate", 3, Some(3), |_, args| {
        let from: Vec<char> = arg_string(args, 1).chars().collect();
        let to: Vec<char> = arg_string(args, 2).chars().collect();
        let out = arg_string(args, 0)
            .chars()
            .filter_map(|c| match from.iter().position(|f| *f == c) {
                Some(i) => to.get(i).copied(),
                None => Some(c),
            })
            .collect();
        Ok(Value::String(out))
    });
    reg.register_fn("compare", 2, Some(2), |_, args| {
        let ord = arg_string(args, 0).cmp(&arg_string(args, 1));
        Ok(Value::Number(ord as i8 as f64))
    });
    reg.register_defaulted("upper-case", 1, Some(1), DefaultArg::ContextNodeSet, |_, args| {
        Ok(Value::String(arg_string(args, 0).to_uppercase()))
    });
    reg.register_defaulted("lower-case", 1, Some(1), DefaultArg::ContextNodeSet, |_, args| {
        Ok(Value::String(arg_string(args, 0).to_lowercase()))
    });
    reg.register_fn("property", 1, Some(1), |_, args| {
        let value = match arg_string(args, 0).as_str() {
            "version" => "1.1",
            "conformance-level" => "full",
            _ => "",
        };
        Ok(Value::String(value.to_string()))
    });
}

/// Characters at 1-based positions `p` with `start <= p < start + length`.
fn substring(s: &str, start: f64, length: Option<f64>) -> String {
    if start.is_nan() {
        return String::new();
    }
    let end = match length {
        Some(len) => start + len,
        None => f64::INFINITY,
    };
    if end.is_nan() {
        return String::new();
    }
    s.chars()
        .enumerate()
        .filter(|(i, _)| {
            let p = (*i + 1) as f64;
            p >= start && p < end
        })
        .map(|(_, c)| c)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::substring;

    #[test]
    fn substring_positions() {
        assert_eq!(substring("eXist-db", 1.0, Some(5.0)), "eXist");
        assert_eq!(substring("12345", 0.0, Some(3.0)), "12");
        assert_eq!(substring("12345", 2.0, None), "2345");
        assert_eq!(substring("12345", f64::NAN, Some(3.0)), "");
        assert_eq!(substring("12345", f64::NEG_INFINITY, Some(f64::INFINITY)), "");
    }
}

use super::{DefaultArg, FunctionRegistry, arg_string};
use crate::value::Value;

pub(super) fn register(reg: &mut FunctionRegistry) {
    reg.register_fn("boolean", 1, Some(1), |_, args| Ok(Value::Boolean(args[0].boolean_value())));
    reg.register_fn("not", 1, Some(1), |_, args| Ok(Value::Boolean(!args[0].boolean_value())));
    reg.register_fn("true", 0, Some(0), |_, _| Ok(Value::Boolean(true)));
    reg.register_fn("false", 0, Some(0), |_, _| Ok(Value::Boolean(false)));
    reg.register_fn("boolean-from-string", 1, Some(1), |_, args| {
        let s = arg_string(args, 0).to_lowercase();
        Ok(Value::Boolean(s == "true" || s == "1"))
    });

    // Both branches are evaluated eagerly; the condition picks one.
    for name in ["if", "choose"] {
        reg.register_fn(name, 3, Some(3), |_, args| {
            Ok(if args[0].boolean_value() { args[1].clone() } else { args[2].clone() })
        });
    }

    reg.register_defaulted("is-card-number", 1, Some(1), DefaultArg::ContextNodeSet, |_, args| {
        Ok(Value::Boolean(luhn(arg_string(args, 0).trim())))
    });
}

fn luhn(digits: &str) -> bool {
    if digits.is_empty() {
        return false;
    }
    let mut sum = 0u32;
    for (i, c) in digits.chars().rev().enumerate() {
        let Some(d) = c.to_digit(10) else {
            return false;
        };
        sum += if i % 2 == 0 {
            d
        } else if d * 2 > 9 {
            d * 2 - 9
        } else {
            d * 2
        };
    }
    sum % 10 == 0
}

#[cfg(test)]
mod tests {
    use super::luhn;

    #[test]
    fn luhn_checksum() {
        assert!(luhn("4111111111111111"));
        assert!(luhn("79927398713"));
        assert!(!luhn("79927398710"));
        assert!(!luhn("4111-1111"));
        assert!(!luhn(""));
    }
}

//! Built-in type tables.
//!
//! The XForms namespace repeats the XML Schema table with every pattern made
//! optional so that an empty value is accepted, and adds a handful of
//! form-oriented types. The XSLTForms namespace holds the arithmetic-entry
//! decimal family.
use crate::error::SchemaError;
use crate::registry::SchemaRegistry;
use crate::types::{AtomicType, ValueClass, WhiteSpace, round_to_digits};
use crate::{XFORMS_NS, XSD_NS, XSLTFORMS_NS};

macro_rules! name_start {
    () => {
        r"A-Za-z_\xC0-\xD6\xD8-\xF6\xF8-\xFF"
    };
}
macro_rules! name_char {
    () => {
        r"A-Za-z_\xC0-\xD6\xD8-\xF6\xF8-\xFF\-.0-9\xB7"
    };
}
macro_rules! uri {
    () => {
        r"(([a-zA-Z][0-9a-zA-Z+\-.]*:)?/{0,2}[0-9a-zA-Z;/?:@&=+$.\-_!~*'()%]+)?(#[0-9a-zA-Z;/?:@&=+$.\-_!~*'()%]+)?"
    };
}

const DATE: &str = r"([12][0-9]{3})-(0[1-9]|1[012])-(0[1-9]|[12][0-9]|3[01])";
const TIME: &str = r"([01][0-9]|2[0-3]):[0-5][0-9]:[0-5][0-9](\.[0-9]+)?";
const ZONE: &str = r"(Z|[+-]([01][0-9]|2[0-3]):[0-5][0-9])?";
const FLOATING: &str = r"^(([-+]?([0-9]+(\.[0-9]*)?)|(\.[0-9]+))([eE][-+]?[0-9]+)?|-?INF|NaN)$";

#[derive(Clone, Copy)]
struct Def {
    name: &'static str,
    /// Local name in the namespace being built, or a qualified name.
    base: Option<&'static str>,
    white_space: Option<WhiteSpace>,
    pattern: Option<&'static str>,
    fraction_digits: Option<usize>,
    min_inclusive: Option<f64>,
    max_inclusive: Option<f64>,
    min_length: Option<usize>,
    max_length: Option<usize>,
    display_length: Option<usize>,
    class: Option<ValueClass>,
    evaluates_as: Option<&'static str>,
    number_hooks: bool,
    amount: bool,
}

const fn def(name: &'static str) -> Def {
    Def {
        name,
        base: None,
        white_space: None,
        pattern: None,
        fraction_digits: None,
        min_inclusive: None,
        max_inclusive: None,
        min_length: None,
        max_length: None,
        display_length: None,
        class: None,
        evaluates_as: None,
        number_hooks: false,
        amount: false,
    }
}

const fn pat(name: &'static str, pattern: &'static str) -> Def {
    Def { pattern: Some(pattern), ..def(name) }
}

const fn int(name: &'static str, base: &'static str, min: Option<f64>, max: Option<f64>) -> Def {
    Def { base: Some(base), min_inclusive: min, max_inclusive: max, ..def(name) }
}

/// Types present in both the XML Schema and the XForms namespaces.
/// Entries refer to bases defined earlier in the table.
const COMMON: &[Def] = &[
    Def { white_space: Some(WhiteSpace::Preserve), ..def("string") },
    Def { class: Some(ValueClass::Boolean), ..pat("boolean", "^(true|false|0|1)$") },
    Def {
        class: Some(ValueClass::Number),
        display_length: Some(8),
        number_hooks: true,
        ..pat("decimal", r"^[\-+]?([0-9]+(\.[0-9]*)?|\.[0-9]+)$")
    },
    Def { class: Some(ValueClass::Number), ..pat("float", FLOATING) },
    Def { class: Some(ValueClass::Number), ..pat("double", FLOATING) },
    Def { class: Some(ValueClass::DateTime), display_length: Some(20), ..def("dateTime") },
    Def { class: Some(ValueClass::Date), display_length: Some(10), ..def("date") },
    Def { display_length: Some(8), ..def("time") },
    pat(
        "duration",
        r"^-?P(?!$)([0-9]+Y)?([0-9]+M)?([0-9]+D)?(T(?!$)([0-9]+H)?([0-9]+M)?([0-9]+(\.[0-9]+)?S)?)?$",
    ),
    pat("gDay", "^---(0[1-9]|[12][0-9]|3[01])$"),
    pat("gMonth", "^--(0[1-9]|1[012])$"),
    pat("gMonthDay", "^--(0[1-9]|1[012])-(0[1-9]|[12][0-9]|3[01])$"),
    pat("gYear", "^[-+]?([12][0-9]{3})$"),
    pat("gYearMonth", "^([12][0-9]{3})-(0[1-9]|1[012])$"),
    Def { base: Some("decimal"), fraction_digits: Some(0), ..def("integer") },
    Def { base: Some("integer"), ..pat("nonPositiveInteger", "^([-][0-9]+|[+]?0+)$") },
    Def { base: Some("integer"), ..pat("nonNegativeInteger", "^[+]?[0-9]+$") },
    Def { base: Some("integer"), ..pat("negativeInteger", "^[-]0*[1-9][0-9]*$") },
    Def { base: Some("integer"), ..pat("positiveInteger", "^[+]?0*[1-9][0-9]*$") },
    int("byte", "integer", Some(-128.0), Some(127.0)),
    int("short", "integer", Some(-32768.0), Some(32767.0)),
    Def { display_length: Some(10), ..int("int", "integer", Some(-2_147_483_648.0), Some(2_147_483_647.0)) },
    Def {
        display_length: Some(19),
        ..int("long", "integer", Some(-9_223_372_036_854_775_808.0), Some(9_223_372_036_854_775_807.0))
    },
    int("unsignedByte", "nonNegativeInteger", None, Some(255.0)),
    int("unsignedShort", "nonNegativeInteger", None, Some(65535.0)),
    Def { display_length: Some(10), ..int("unsignedInt", "nonNegativeInteger", None, Some(4_294_967_295.0)) },
    Def {
        display_length: Some(19),
        ..int("unsignedLong", "nonNegativeInteger", None, Some(18_446_744_073_709_551_615.0))
    },
    Def { white_space: Some(WhiteSpace::Replace), ..def("normalizedString") },
    Def { white_space: Some(WhiteSpace::Collapse), ..def("token") },
    Def { base: Some("token"), ..pat("language", "^[a-zA-Z]{1,8}(-[a-zA-Z0-9]{1,8})*$") },
    Def { base: Some("token"), ..pat("anyURI", concat!("^", uri!(), "$")) },
    Def { base: Some("token"), ..pat("Name", concat!("^[", name_start!(), ":][", name_char!(), ":]*$")) },
    Def { base: Some("token"), ..pat("NCName", concat!("^[", name_start!(), "][", name_char!(), "]*$")) },
    Def {
        base: Some("token"),
        ..pat("QName", concat!("^(", uri!(), ":)?[", name_start!(), "][", name_char!(), "]*$"))
    },
    Def { base: Some("NCName"), ..def("ID") },
    Def { base: Some("NCName"), ..def("IDREF") },
    pat(
        "IDREFS",
        concat!("^[", name_start!(), "][", name_char!(), "]*( +[", name_start!(), "][", name_char!(), "]*)*$"),
    ),
    pat("NMTOKEN", concat!("^[", name_char!(), "]+$")),
    pat("NMTOKENS", concat!("^[", name_char!(), "]+( +[", name_char!(), "]+)*$")),
    pat("base64Binary", "^[a-zA-Z0-9+/]+={0,2}$"),
    pat("hexBinary", "^([0-9A-Fa-f]{2})+$"),
];

/// Form-oriented additions in the XForms namespace.
const XFORMS_ONLY: &[Def] = &[
    pat("dayTimeDuration", r"^-?P(?!$)([0-9]+D)?(T(?!$)([0-9]+H)?([0-9]+M)?([0-9]+(\.[0-9]*)?S)?)?$"),
    pat("yearMonthDuration", "^-?P[0-9]+(Y([0-9]+M)?|M)$"),
    Def {
        base: Some("xsd:string"),
        white_space: Some(WhiteSpace::Collapse),
        ..pat(
            "email",
            r"^[A-Za-z0-9!#-'*+\-/=?^_`{-~]+(\.[A-Za-z0-9!#-'*+\-/=?^_`{-~]+)*@[A-Za-z0-9!#-'*+\-/=?^_`{-~]+(\.[A-Za-z0-9!#-'*+\-/=?^_`{-~]+)*$",
        )
    },
    Def { base: Some("xsd:string"), min_length: Some(12), max_length: Some(19), ..pat("card-number", "^[0-9]+$") },
    Def {
        base: Some("xsd:string"),
        white_space: Some(WhiteSpace::Collapse),
        ..pat("url", r"^(ht|f)tp(s?)://([a-z0-9]*:[a-z0-9]*@)?([a-z0-9.\-]*\.[a-z]{2,7})(/\S*)?$")
    },
    Def { base: Some("xsd:decimal"), amount: true, ..def("amount") },
];

const fn arith(name: &'static str, evaluates_as: &'static str) -> Def {
    Def { base: Some("decimal"), evaluates_as: Some(evaluates_as), ..def(name) }
}

/// Decimal family accepting arithmetic such as `12*3+(4/2)`.
const XSLTFORMS: &[Def] = &[
    Def {
        class: Some(ValueClass::Number),
        evaluates_as: Some("xsd:decimal"),
        ..pat("decimal", r"^[-+]?\(*[-+]?[0-9]*(\.[0-9]*)?(([+\-/]|\*)\(*[0-9]*(\.[0-9]*)?\)*)*$")
    },
    arith("float", "xsd:float"),
    arith("double", "xsd:double"),
    arith("integer", "xsd:integer"),
    arith("nonPositiveInteger", "xsd:nonPositiveInteger"),
    arith("nonNegativeInteger", "xsd:nonNegativeInteger"),
    arith("negativeInteger", "xsd:negativeInteger"),
    arith("positiveInteger", "xsd:positiveInteger"),
    arith("byte", "xsd:byte"),
    arith("short", "xsd:short"),
    arith("int", "xsd:int"),
    arith("long", "xsd:long"),
    arith("unsignedByte", "xsd:unsignedByte"),
    arith("unsignedShort", "xsd:unsignedShort"),
    arith("unsignedInt", "xsd:unsignedInt"),
    arith("unsignedLong", "xsd:unsignedLong"),
];

fn format_number(t: &AtomicType, value: &str) -> String {
    match t.fraction_digits() {
        Some(digits) if !value.trim().is_empty() => round_to_digits(value, digits),
        _ => value.to_string(),
    }
}

fn format_amount(_: &AtomicType, value: &str) -> String {
    if value.trim().is_empty() { value.to_string() } else { round_to_digits(value, 2) }
}

/// Entered numbers may use spaces as group separators.
fn parse_number(_: &AtomicType, value: &str) -> String {
    value.chars().filter(|c| !c.is_whitespace()).collect()
}

/// `^X$` becomes `^(?:X)?$`.
fn optional(pattern: &str) -> String {
    let inner = pattern.strip_prefix('^').and_then(|p| p.strip_suffix('$')).unwrap_or(pattern);
    format!("^(?:{inner})?$")
}

fn temporal_pattern(name: &str) -> Option<String> {
    match name {
        "dateTime" => Some(format!("^{DATE}T{TIME}{ZONE}$")),
        "date" => Some(format!("^{DATE}{ZONE}$")),
        "time" => Some(format!("^{TIME}{ZONE}$")),
        _ => None,
    }
}

fn build(registry: &SchemaRegistry, ns: &str, d: &Def, allow_empty: bool) -> Result<AtomicType, SchemaError> {
    let mut t = match d.base {
        Some(base) => {
            let base = if base.contains(':') {
                registry.get_type(base)?
            } else {
                registry.get_type_ns(ns, base)?
            };
            let base = base.as_atomic().ok_or_else(|| SchemaError::NotAtomic(base.name().to_string()))?;
            AtomicType::derived(d.name, base)
        }
        None => AtomicType::new(d.name),
    };

    let own = d.pattern.map(str::to_string).or_else(|| temporal_pattern(d.name));
    if let Some(p) = own {
        t = t.with_pattern(&if allow_empty { optional(&p) } else { p })?;
    }
    if let Some(ws) = d.white_space {
        t = t.with_white_space(ws);
    }
    if let Some(digits) = d.fraction_digits {
        t = t.with_fraction_digits(digits);
    }
    if let Some(b) = d.min_inclusive {
        t = t.with_min_inclusive(b);
    }
    if let Some(b) = d.max_inclusive {
        t = t.with_max_inclusive(b);
    }
    if let Some(l) = d.min_length {
        t = t.with_min_length(l);
    }
    if let Some(l) = d.max_length {
        t = t.with_max_length(l);
    }
    if let Some(l) = d.display_length {
        t = t.with_display_length(l);
    }
    if let Some(class) = d.class {
        t = t.with_class(class);
    }
    if let Some(target) = d.evaluates_as {
        t = t.with_evaluates_as(target);
    }
    if d.number_hooks {
        t = t.with_format(format_number).with_parse(parse_number);
    }
    if d.amount {
        t = t.with_format(format_amount);
    }
    Ok(t)
}

fn install_table(registry: &mut SchemaRegistry, ns: &str, table: &[Def], allow_empty: bool) -> Result<(), SchemaError> {
    for d in table {
        let t = build(registry, ns, d, allow_empty)?;
        registry.schema_mut(ns).define(t);
    }
    Ok(())
}

pub(crate) fn install(registry: &mut SchemaRegistry) -> Result<(), SchemaError> {
    install_table(registry, XSD_NS, COMMON, false)?;
    install_table(registry, XFORMS_NS, COMMON, true)?;
    install_table(registry, XFORMS_NS, XFORMS_ONLY, true)?;
    install_table(registry, XSLTFORMS_NS, XSLTFORMS, false)?;
    tracing::debug!(
        xsd = registry.schema(XSD_NS).map_or(0, |s| s.len()),
        xforms = registry.schema(XFORMS_NS).map_or(0, |s| s.len()),
        "built-in types installed"
    );
    Ok(())
}

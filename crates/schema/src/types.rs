use std::rc::Rc;

use crate::error::SchemaError;

pub type TypeRef = Rc<Type>;

/// Hook turning a stored lexical value into its display form, or back.
pub type ValueHook = fn(&AtomicType, &str) -> String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WhiteSpace {
    #[default]
    Preserve,
    /// Tabs and line breaks become spaces.
    Replace,
    /// As `Replace`, then runs of spaces shrink to one and the ends are trimmed.
    Collapse,
}

impl WhiteSpace {
    pub fn apply(self, value: &str) -> String {
        match self {
            WhiteSpace::Preserve => value.to_string(),
            WhiteSpace::Replace => value.replace(['\t', '\r', '\n'], " "),
            WhiteSpace::Collapse => value
                .split(|c: char| matches!(c, ' ' | '\t' | '\r' | '\n'))
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

/// Rendering category a control can use to pick a widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueClass {
    Boolean,
    Number,
    DateTime,
    Date,
}

#[derive(Debug, Clone)]
struct Pattern {
    source: String,
    regex: Rc<fancy_regex::Regex>,
}

impl Pattern {
    fn compile(source: &str) -> Result<Self, SchemaError> {
        let regex = fancy_regex::Regex::new(source).map_err(|e| SchemaError::InvalidPattern {
            pattern: source.to_string(),
            source: Box::new(e),
        })?;
        Ok(Self { source: source.to_string(), regex: Rc::new(regex) })
    }

    fn is_match(&self, value: &str) -> bool {
        self.regex.is_match(value).unwrap_or_else(|error| {
            tracing::debug!(pattern = %self.source, %error, "pattern evaluation failed");
            false
        })
    }
}

/// Atomic type with XML Schema facets.
#[derive(Debug, Clone, Default)]
pub struct AtomicType {
    name: String,
    white_space: WhiteSpace,
    patterns: Vec<Pattern>,
    enumeration: Option<Vec<String>>,
    length: Option<usize>,
    min_length: Option<usize>,
    max_length: Option<usize>,
    min_inclusive: Option<f64>,
    max_inclusive: Option<f64>,
    min_exclusive: Option<f64>,
    max_exclusive: Option<f64>,
    total_digits: Option<usize>,
    fraction_digits: Option<usize>,
    display_length: Option<usize>,
    class: Option<ValueClass>,
    evaluates_as: Option<String>,
    format: Option<ValueHook>,
    parse: Option<ValueHook>,
}

impl AtomicType {
    pub fn new(name: &str) -> Self {
        Self { name: name.to_string(), ..Self::default() }
    }

    /// A new type starting from a snapshot of `base`'s facets.
    ///
    /// Patterns accumulate: `base`'s come first and the new type's own are
    /// appended. Later changes to `base` are not seen.
    pub fn derived(name: &str, base: &AtomicType) -> Self {
        let mut t = Self::new(name);
        t.derive_from(base);
        t
    }

    pub fn derive_from(&mut self, base: &AtomicType) {
        let mut patterns = base.patterns.clone();
        patterns.append(&mut self.patterns);
        let name = std::mem::take(&mut self.name);
        *self = Self { name, patterns, ..base.clone() };
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn with_white_space(mut self, ws: WhiteSpace) -> Self {
        self.white_space = ws;
        self
    }

    pub fn with_pattern(mut self, pattern: &str) -> Result<Self, SchemaError> {
        self.patterns.push(Pattern::compile(pattern)?);
        Ok(self)
    }

    #[must_use]
    pub fn with_enumeration<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enumeration = Some(values.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_length(mut self, length: usize) -> Self {
        self.length = Some(length);
        self
    }

    #[must_use]
    pub fn with_min_length(mut self, length: usize) -> Self {
        self.min_length = Some(length);
        self
    }

    #[must_use]
    pub fn with_max_length(mut self, length: usize) -> Self {
        self.max_length = Some(length);
        self
    }

    #[must_use]
    pub fn with_min_inclusive(mut self, bound: f64) -> Self {
        self.min_inclusive = Some(bound);
        self
    }

    #[must_use]
    pub fn with_max_inclusive(mut self, bound: f64) -> Self {
        self.max_inclusive = Some(bound);
        self
    }

    #[must_use]
    pub fn with_min_exclusive(mut self, bound: f64) -> Self {
        self.min_exclusive = Some(bound);
        self
    }

    #[must_use]
    pub fn with_max_exclusive(mut self, bound: f64) -> Self {
        self.max_exclusive = Some(bound);
        self
    }

    #[must_use]
    pub fn with_total_digits(mut self, digits: usize) -> Self {
        self.total_digits = Some(digits);
        self
    }

    #[must_use]
    pub fn with_fraction_digits(mut self, digits: usize) -> Self {
        self.fraction_digits = Some(digits);
        self
    }

    #[must_use]
    pub fn with_display_length(mut self, length: usize) -> Self {
        self.display_length = Some(length);
        self
    }

    #[must_use]
    pub fn with_class(mut self, class: ValueClass) -> Self {
        self.class = Some(class);
        self
    }

    /// Qualified name of the type the entered text evaluates to.
    #[must_use]
    pub fn with_evaluates_as(mut self, qname: &str) -> Self {
        self.evaluates_as = Some(qname.to_string());
        self
    }

    #[must_use]
    pub fn with_format(mut self, hook: ValueHook) -> Self {
        self.format = Some(hook);
        self
    }

    #[must_use]
    pub fn with_parse(mut self, hook: ValueHook) -> Self {
        self.parse = Some(hook);
        self
    }

    pub fn white_space(&self) -> WhiteSpace {
        self.white_space
    }
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(|p| p.source.as_str())
    }
    pub fn fraction_digits(&self) -> Option<usize> {
        self.fraction_digits
    }
    pub fn total_digits(&self) -> Option<usize> {
        self.total_digits
    }
    pub fn class(&self) -> Option<ValueClass> {
        self.class
    }
    pub fn evaluates_as(&self) -> Option<&str> {
        self.evaluates_as.as_deref()
    }

    pub fn canonical_value(&self, value: &str) -> String {
        self.white_space.apply(value)
    }

    pub fn validate(&self, value: &str) -> bool {
        let value = self.canonical_value(value);

        if !self.patterns.iter().all(|p| p.is_match(&value)) {
            return false;
        }
        if let Some(allowed) = &self.enumeration
            && !allowed.iter().any(|e| self.canonical_value(e) == value)
        {
            return false;
        }

        let len = value.chars().count();
        if self.length.is_some_and(|l| l != len)
            || self.min_length.is_some_and(|l| len < l)
            || self.max_length.is_some_and(|l| len > l)
        {
            return false;
        }

        // Values that do not read as a number skip the range facets.
        if let Ok(n) = value.trim().parse::<f64>()
            && (self.max_inclusive.is_some_and(|b| n > b)
                || self.max_exclusive.is_some_and(|b| n >= b)
                || self.min_inclusive.is_some_and(|b| n < b)
                || self.min_exclusive.is_some_and(|b| n <= b))
        {
            return false;
        }

        if self.total_digits.is_some() || self.fraction_digits.is_some() {
            return self.check_digits(&value);
        }
        true
    }

    fn check_digits(&self, value: &str) -> bool {
        let unsigned = value.trim_start_matches(['+', '-']);
        let (integer, fraction) = match unsigned.split_once('.') {
            Some((i, f)) => {
                if self.fraction_digits == Some(0) {
                    return false;
                }
                (i, f.trim_end_matches('0'))
            }
            None => (unsigned, ""),
        };
        let integer = integer.trim_start_matches('0');
        let integer_digits = integer.chars().filter(char::is_ascii_digit).count();
        let fraction_digits = fraction.chars().filter(char::is_ascii_digit).count();
        !(self.total_digits.is_some_and(|t| integer_digits + fraction_digits > t)
            || self.fraction_digits.is_some_and(|f| fraction_digits > f))
    }

    /// Round to `fractionDigits` when that facet is set; otherwise unchanged.
    pub fn normalize(&self, value: &str) -> String {
        match self.fraction_digits {
            Some(digits) => round_to_digits(value, digits),
            None => value.to_string(),
        }
    }

    pub fn max_length(&self) -> Option<usize> {
        self.max_length.or(self.length).or(self.total_digits.map(|d| d + 1))
    }

    pub fn display_length(&self) -> Option<usize> {
        self.display_length.or_else(|| self.max_length())
    }

    pub fn format(&self, value: &str) -> String {
        match self.format {
            Some(hook) => hook(self, value),
            None => value.to_string(),
        }
    }

    pub fn parse(&self, value: &str) -> String {
        match self.parse {
            Some(hook) => hook(self, value),
            None => value.to_string(),
        }
    }
}

/// Decimal rounding with half-up ties, rendered with exactly `digits`
/// fraction digits. Non-numeric input gives `"NaN"`.
pub(crate) fn round_to_digits(value: &str, digits: usize) -> String {
    let Ok(number) = value.trim().parse::<f64>() else {
        return "NaN".to_string();
    };
    if !number.is_finite() {
        return "NaN".to_string();
    }
    let exponent = i32::try_from(digits).unwrap_or(i32::MAX);
    let scaled = (number.abs() * 10f64.powi(exponent) + 0.5).floor();
    let mut text = format!("{scaled:.0}");
    if text.len() <= digits {
        text = format!("{}{text}", "0".repeat(digits + 1 - text.len()));
    }
    let negative = number < 0.0 && scaled != 0.0;
    let sign = if negative { "-" } else { "" };
    if digits == 0 {
        return format!("{sign}{text}");
    }
    let (int, frac) = text.split_at(text.len() - digits);
    format!("{sign}{int}.{frac}")
}

/// Whitespace-separated list of items of one type.
#[derive(Debug, Clone)]
pub struct ListType {
    name: String,
    item: TypeRef,
    length: Option<usize>,
    min_length: Option<usize>,
    max_length: Option<usize>,
}

impl ListType {
    pub fn new(name: &str, item: TypeRef) -> Self {
        Self { name: name.to_string(), item, length: None, min_length: None, max_length: None }
    }

    #[must_use]
    pub fn with_length(mut self, length: usize) -> Self {
        self.length = Some(length);
        self
    }

    #[must_use]
    pub fn with_min_length(mut self, length: usize) -> Self {
        self.min_length = Some(length);
        self
    }

    #[must_use]
    pub fn with_max_length(mut self, length: usize) -> Self {
        self.max_length = Some(length);
        self
    }

    pub fn item_type(&self) -> &TypeRef {
        &self.item
    }

    pub fn canonical_value(&self, value: &str) -> String {
        WhiteSpace::Collapse
            .apply(value)
            .split(' ')
            .filter(|s| !s.is_empty())
            .map(|item| self.item.canonical_value(item))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Every item must be valid; length facets count items.
    pub fn validate(&self, value: &str) -> bool {
        let collapsed = WhiteSpace::Collapse.apply(value);
        let items: Vec<&str> = collapsed.split(' ').filter(|s| !s.is_empty()).collect();
        if !items.iter().all(|item| self.item.validate(item)) {
            return false;
        }
        let count = items.len();
        !(self.length.is_some_and(|l| l != count)
            || self.min_length.is_some_and(|l| count < l)
            || self.max_length.is_some_and(|l| count > l))
    }
}

/// Accepts a value when any member type does.
#[derive(Debug, Clone)]
pub struct UnionType {
    name: String,
    members: Vec<TypeRef>,
}

impl UnionType {
    pub fn new(name: &str) -> Self {
        Self { name: name.to_string(), members: Vec::new() }
    }

    #[must_use]
    pub fn with_member(mut self, member: TypeRef) -> Self {
        self.members.push(member);
        self
    }

    pub fn members(&self) -> &[TypeRef] {
        &self.members
    }

    pub fn validate(&self, value: &str) -> bool {
        self.members.iter().any(|m| m.validate(value))
    }
}

#[derive(Debug, Clone)]
pub enum Type {
    Atomic(AtomicType),
    List(ListType),
    Union(UnionType),
}

impl Type {
    pub fn name(&self) -> &str {
        match self {
            Type::Atomic(t) => &t.name,
            Type::List(t) => &t.name,
            Type::Union(t) => &t.name,
        }
    }

    pub fn as_atomic(&self) -> Option<&AtomicType> {
        match self {
            Type::Atomic(t) => Some(t),
            _ => None,
        }
    }

    pub fn validate(&self, value: &str) -> bool {
        match self {
            Type::Atomic(t) => t.validate(value),
            Type::List(t) => t.validate(value),
            Type::Union(t) => t.validate(value),
        }
    }

    pub fn canonical_value(&self, value: &str) -> String {
        match self {
            Type::Atomic(t) => t.canonical_value(value),
            Type::List(t) => t.canonical_value(value),
            Type::Union(_) => value.to_string(),
        }
    }

    pub fn normalize(&self, value: &str) -> String {
        match self {
            Type::Atomic(t) => t.normalize(value),
            _ => value.to_string(),
        }
    }

    pub fn format(&self, value: &str) -> String {
        match self {
            Type::Atomic(t) => t.format(value),
            _ => value.to_string(),
        }
    }

    pub fn parse(&self, value: &str) -> String {
        match self {
            Type::Atomic(t) => t.parse(value),
            _ => value.to_string(),
        }
    }

    pub fn class(&self) -> Option<ValueClass> {
        self.as_atomic().and_then(AtomicType::class)
    }

    pub fn display_length(&self) -> Option<usize> {
        self.as_atomic().and_then(AtomicType::display_length)
    }
}

impl From<AtomicType> for Type {
    fn from(t: AtomicType) -> Self {
        Type::Atomic(t)
    }
}

impl From<ListType> for Type {
    fn from(t: ListType) -> Self {
        Type::List(t)
    }
}

impl From<UnionType> for Type {
    fn from(t: UnionType) -> Self {
        Type::Union(t)
    }
}

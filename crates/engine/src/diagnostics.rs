use bindery_xpath::{ElementId, ErrorCode};

use crate::error::EngineError;

/// A failure recorded during a build pass instead of aborting it.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub element: Option<ElementId>,
    pub name: Option<String>,
    pub code: Option<ErrorCode>,
    pub message: String,
}

impl Diagnostic {
    pub(crate) fn from_error(element: Option<ElementId>, name: Option<&str>, error: &EngineError) -> Self {
        let mut message = error.to_string();
        let mut cause = std::error::Error::source(error);
        while let Some(inner) = cause {
            message.push_str(": ");
            message.push_str(&inner.to_string());
            cause = inner.source();
        }
        Self { element, name: name.map(str::to_string), code: error.xpath_code(), message }
    }
}

#[derive(Debug, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn push(&mut self, diagnostic: Diagnostic) {
        tracing::trace!(
            element = ?diagnostic.element,
            name = diagnostic.name.as_deref().unwrap_or(""),
            message = %diagnostic.message,
            "diagnostic recorded"
        );
        self.items.push(diagnostic);
    }

    /// Record an evaluation failure and substitute `fallback`; every other
    /// error passes through.
    pub(crate) fn recover<T>(
        &mut self,
        result: Result<T, EngineError>,
        fallback: T,
        name: Option<&str>,
    ) -> Result<T, EngineError> {
        match result {
            Err(error @ EngineError::Evaluation { .. }) => {
                self.push(Diagnostic::from_error(None, name, &error));
                Ok(fallback)
            }
            other => other,
        }
    }

    /// Log everything recorded after the first `since` items as one batch.
    pub(crate) fn report_since(&self, since: usize) {
        let batch = self.items.get(since..).unwrap_or_default();
        if batch.is_empty() {
            return;
        }
        let messages = batch.iter().map(|d| d.message.as_str()).collect::<Vec<_>>().join("; ");
        tracing::warn!(count = batch.len(), %messages, "binding errors during flush");
    }

    pub fn take(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.items)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use bindery_xpath::Error as XPathError;

    use super::*;

    #[test]
    fn only_evaluation_errors_are_recovered() {
        let mut diagnostics = Diagnostics::default();
        let failed = Err(EngineError::evaluation("namespace::*", XPathError::from_code(ErrorCode::XPST0010, "axis")));
        assert!(!diagnostics.recover(failed, false, Some("b")).unwrap());
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics.iter().next().and_then(|d| d.code), Some(ErrorCode::XPST0010));

        let fatal: Result<bool, _> = Err(EngineError::FlushDiverged { iterations: 3 });
        assert!(diagnostics.recover(fatal, false, None).is_err());
        assert_eq!(diagnostics.len(), 1);
    }
}

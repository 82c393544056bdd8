use bindery_xpath::{ModelId, Node, parse_document};

use crate::error::EngineError;

/// One instance document of a model, with the pristine copy `reset`
/// restores.
#[derive(Debug)]
pub struct Instance {
    name: String,
    document: Node,
    pristine: Node,
}

impl Instance {
    pub(crate) fn parse(name: &str, xml: &str, model: ModelId) -> Result<Self, EngineError> {
        let document =
            parse_document(xml).map_err(|source| EngineError::Instance { id: name.to_string(), source })?;
        Ok(Self::from_document(name, document, model))
    }

    pub(crate) fn from_document(name: &str, document: Node, model: ModelId) -> Self {
        let pristine = document.deep_clone();
        document.set_owner_model(Some(model));
        Self { name: name.to_string(), document, pristine }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn document(&self) -> &Node {
        &self.document
    }

    /// Document element, if the instance is not empty.
    pub fn root(&self) -> Option<Node> {
        self.document.document_element()
    }

    pub(crate) fn reset(&mut self) {
        let document = self.pristine.deep_clone();
        document.set_owner_model(self.document.owner_model());
        self.document = document;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_restores_the_loaded_document() {
        let mut instance = Instance::parse("i", "<a><b>1</b></a>", ModelId(0)).unwrap();
        let b = instance.root().unwrap().first_child().unwrap();
        b.set_value("2");
        instance.reset();
        assert_eq!(instance.root().unwrap().string_value(), "1");
        assert_eq!(instance.document().owner_model(), Some(ModelId(0)));
    }

    #[test]
    fn malformed_instances_are_rejected() {
        assert!(matches!(Instance::parse("bad", "<a>", ModelId(0)), Err(EngineError::Instance { .. })));
    }
}

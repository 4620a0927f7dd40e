//! Structural fixups applied after loading

use std::fmt::Debug;

use tracing::debug;

use crate::catalog::ValueType;
use crate::document::Document;
use crate::model::{IntrinsicKind, PropertyForm, PropertyId};

pub trait Normalizer: Debug {
    /// Rewrite the document in place, returning the number of changes
    fn normalize(&self, document: &mut Document) -> usize;
}

/// Replaces `<prop><fx:reference source="x"/></prop>` with `prop="$x"`
#[derive(Debug)]
pub struct ReferenceExpressionNormalizer;

impl ReferenceExpressionNormalizer {
    fn candidate(document: &Document, property: PropertyId) -> Option<String> {
        let node = document.property(property);
        if !matches!(node.form(), PropertyForm::Element(_)) || node.kind().is_text() {
            return None;
        }
        let [value] = node.values() else {
            return None;
        };
        if document.intrinsic_kind(*value) != Some(IntrinsicKind::Reference)
            || !document.properties_of(*value).is_empty()
        {
            return None;
        }
        if !node.name().is_static() {
            let owner_class = node.owner().and_then(|owner| document.declared_class(owner));
            let list = owner_class
                .and_then(|class| document.catalog().property(class, &node.name().name))
                .map(|descriptor| descriptor.value_type == ValueType::List)
                .unwrap_or(false);
            if list {
                return None;
            }
        }
        document.intrinsic_source(*value)
    }
}

impl Normalizer for ReferenceExpressionNormalizer {
    fn normalize(&self, document: &mut Document) -> usize {
        let Some(root) = document.root() else {
            return 0;
        };
        let candidates: Vec<(PropertyId, String)> = document
            .descendant_properties(root)
            .into_iter()
            .filter_map(|property| Self::candidate(document, property).map(|source| (property, source)))
            .collect();

        for (property, source) in &candidates {
            let Some(owner) = document.property(*property).owner() else {
                continue;
            };
            let name = document.property(*property).name().clone();
            debug!(property = %name, source = %source, "reference element to expression");
            document.remove_property(*property);
            let expression = document.new_property_text(name, &format!("${}", source));
            document.add_property(owner, expression);
        }
        candidates.len()
    }
}

#[cfg(test)]
mod tests {
    use crate::loader::LoadOptions;
    use crate::test_support::{load, load_with};

    const SOURCE: &str = r#"<?import javafx.scene.control.*?>
<?import javafx.scene.layout.*?>
<VBox>
    <Label fx:id="name"/>
    <Label>
        <labelFor>
            <fx:reference source="name"/>
        </labelFor>
    </Label>
</VBox>"#;

    #[test]
    fn test_reference_element_becomes_expression() {
        let document = load_with(SOURCE, &LoadOptions::normalized());
        assert_eq!(
            document.glue_text(),
            r#"<?import javafx.scene.control.*?>
<?import javafx.scene.layout.*?>
<VBox>
    <Label fx:id="name"/>
    <Label labelFor="$name"/>
</VBox>"#
        );
    }

    #[test]
    fn test_normalization_is_opt_in() {
        let document = load(SOURCE);
        assert_eq!(document.glue_text(), SOURCE);
    }
}

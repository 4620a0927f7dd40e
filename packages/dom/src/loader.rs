//! Loads markup text into a [`Document`].
//!
//! ```text
//! text ──▶ glue parse ──▶ TransientBuilder ──▶ normalizers ──▶ evaluator
//!           (fatal)        (unresolved ok)     (optional)      (live values)
//! ```

use std::rc::Rc;

use tracing::{debug, instrument};
use url::Url;

use crate::context::ClassLoadingContext;
use crate::document::Document;
use crate::error::DomResult;
use crate::evaluator::evaluate;
use crate::transient::TransientBuilder;

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Run the context's normalizers after building the tree
    pub normalize: bool,
}

impl LoadOptions {
    pub fn normalized() -> Self {
        Self { normalize: true }
    }
}

pub struct Loader {
    context: Rc<ClassLoadingContext>,
    options: LoadOptions,
    include_stack: Vec<Url>,
}

impl Loader {
    pub fn new(context: Rc<ClassLoadingContext>, options: LoadOptions) -> Self {
        Self {
            context,
            options,
            include_stack: Vec::new(),
        }
    }

    /// Locations of the documents currently including the one being loaded
    pub(crate) fn with_include_stack(mut self, include_stack: Vec<Url>) -> Self {
        self.include_stack = include_stack;
        self
    }

    #[instrument(skip(self, text))]
    pub fn load(&self, text: &str, location: Option<Url>) -> DomResult<Document> {
        let glue = fxom_glue::parse(text)?;
        let mut document = Document::with_glue(glue, location, self.context.clone());

        let context = self.context.clone();
        let unresolved = TransientBuilder::new(&mut document, &context).build();
        document.unresolved_classes = unresolved;

        if self.options.normalize {
            for normalizer in &context.extensions.normalizers {
                let changes = normalizer.normalize(&mut document);
                if changes > 0 {
                    debug!(normalizer = ?normalizer, changes, "normalized");
                }
            }
        }

        evaluate(&mut document, &self.include_stack);
        debug!(
            objects = document.object_count(),
            unresolved = document.unresolved_classes().len(),
            "document loaded"
        );
        Ok(document)
    }
}

use serde::{Deserialize, Serialize};

use crate::{
    record::{Document, Model, Record},
    AdUnit, Custom, Error, Geography, NodeTree, Result, Target, TreeBuilderConfig,
};

/// Kinds of hierarchical targets the ad server can list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum TargetType {
    AdUnit,
    Geography,
    Demographics,
    AdPosition,
    Custom,
}

impl TargetType {
    /// Discriminator carried by every node of a tree of this type.
    pub fn type_name(self) -> &'static str {
        match self {
            TargetType::AdUnit => AdUnit::TYPE_NAME,
            TargetType::Geography => Geography::TYPE_NAME,
            TargetType::Demographics | TargetType::AdPosition | TargetType::Custom => {
                Custom::TYPE_NAME
            }
        }
    }
}

/// Supplier of flat target records, usually backed by the ad server's API.
///
/// Implemented for closures, so a plain function can serve as a source:
///
/// ```
/// # use adtargeting::{AdUnit, Result, Target, TargetType, TargetSource};
/// fn fetch(target_type: TargetType) -> Result<Vec<Target>> {
///     Ok(match target_type {
///         TargetType::AdUnit => vec![AdUnit::default().into()],
///         _ => Vec::new(),
///     })
/// }
///
/// assert_eq!(fetch.fetch_targets(TargetType::AdUnit).unwrap().len(), 1);
/// ```
pub trait TargetSource {
    /// List every record of `target_type`, in the order the server returned them.
    ///
    /// Transport failures should be reported as [`Error::Source`].
    fn fetch_targets(&self, target_type: TargetType) -> Result<Vec<Target>>;
}

impl<T: Fn(TargetType) -> Result<Vec<Target>>> TargetSource for T {
    fn fetch_targets(&self, target_type: TargetType) -> Result<Vec<Target>> {
        self(target_type)
    }
}

/// Builds [`NodeTree`]s from a [`TargetSource`].
///
/// Use [`TreeBuilderConfig`] to create an instance.
pub struct TreeBuilder<'a> {
    config: TreeBuilderConfig<'a>,
}

impl<'a> TreeBuilder<'a> {
    /// Create a new `TreeBuilder` using the specified configuration.
    ///
    /// ```
    /// # use adtargeting::{Result, Target, TargetType, TreeBuilder, TreeBuilderConfig};
    /// # fn no_targets(_: TargetType) -> Result<Vec<Target>> { Ok(Vec::new()) }
    /// let builder = TreeBuilder::new(TreeBuilderConfig::from_source(no_targets));
    /// ```
    pub fn new(config: TreeBuilderConfig<'a>) -> Self {
        TreeBuilder { config }
    }

    /// Fetch every record of `target_type` and assemble them into a tree.
    ///
    /// # Errors
    ///
    /// Source failures are passed through. Otherwise see [`NodeTree::build_with_max_depth`].
    pub fn construct_tree(&self, target_type: TargetType) -> Result<NodeTree<Target>> {
        let targets = self
            .config
            .source
            .fetch_targets(target_type)
            .inspect_err(|err| {
                log::warn!(target: "adtargeting", target_type:serde; "failed to fetch targets: {err}")
            })?;

        log::debug!(target: "adtargeting", target_type:serde, count = targets.len(); "fetched targets");

        NodeTree::build_with_max_depth(targets, self.config.max_depth)
    }

    /// Rebuild a tree of `target_type` from its document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnexpectedType`] if any node is not of `target_type`, in addition to the
    /// errors of [`NodeTree::from_doc`](Record::from_doc).
    pub fn tree_from_doc(doc: &Document, target_type: TargetType) -> Result<NodeTree<Target>> {
        let tree = NodeTree::<Target>::from_doc(doc)?;

        let expected = target_type.type_name();
        if let Some(node) = tree.flatten().into_iter().find(|n| n.type_name() != expected) {
            return Err(Error::UnexpectedType {
                expected,
                found: node.type_name().to_owned(),
            });
        }
        Ok(tree)
    }
}

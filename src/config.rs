use crate::{TargetSource, TreeBuilder};

/// Configuration for [`TreeBuilder`].
pub struct TreeBuilderConfig<'a> {
    pub(crate) source: Box<dyn TargetSource + Send + Sync + 'a>,
    pub(crate) max_depth: usize,
}

impl<'a> TreeBuilderConfig<'a> {
    /// Create a default configuration that fetches records from `source`.
    ///
    /// ```
    /// # use adtargeting::{Result, Target, TargetType, TreeBuilderConfig};
    /// fn no_targets(_: TargetType) -> Result<Vec<Target>> {
    ///     Ok(Vec::new())
    /// }
    ///
    /// TreeBuilderConfig::from_source(no_targets);
    /// ```
    pub fn from_source(source: impl TargetSource + Send + Sync + 'a) -> Self {
        TreeBuilderConfig {
            source: Box::new(source),
            max_depth: TreeBuilderConfig::DEFAULT_MAX_DEPTH,
        }
    }

    /// Default bound on tree depth.
    pub const DEFAULT_MAX_DEPTH: usize = 256;

    /// Override the bound on tree depth. Construction fails with
    /// [`Error::DepthLimitExceeded`](crate::Error::DepthLimitExceeded) past it.
    ///
    /// ```
    /// # use adtargeting::{Result, Target, TargetType, TreeBuilderConfig};
    /// # fn no_targets(_: TargetType) -> Result<Vec<Target>> { Ok(Vec::new()) }
    /// let mut config = TreeBuilderConfig::from_source(no_targets);
    /// config.max_depth(8);
    /// ```
    pub fn max_depth(&mut self, max_depth: usize) -> &mut Self {
        self.max_depth = max_depth;
        self
    }

    /// Create a new [`TreeBuilder`] using the specified configuration.
    ///
    /// ```
    /// # use adtargeting::{Result, Target, TargetType, TreeBuilder, TreeBuilderConfig};
    /// # fn no_targets(_: TargetType) -> Result<Vec<Target>> { Ok(Vec::new()) }
    /// let builder: TreeBuilder = TreeBuilderConfig::from_source(no_targets).to_builder();
    /// ```
    pub fn to_builder(self) -> TreeBuilder<'a> {
        TreeBuilder::new(self)
    }
}

use std::fmt;
use std::sync::Arc;

use crate::error::{ConfigurationError, MigrationError};

use super::runner::MigrationContext;

/// Fresh-state factory of the latest schema version.
pub type Initializer<P> = Arc<dyn Fn() -> P + Send + Sync>;

/// Structural step producing a version `n` payload from a version `n - 1`
/// payload.
pub type Migrator<P> = Arc<
    dyn Fn(P, &mut MigrationContext<P>) -> Result<P, MigrationError>
        + Send
        + Sync,
>;

/// Descriptor for one schema revision.
pub struct SchemaVersion<P> {
    version: u32,
    create: Option<Initializer<P>>,
    migrate: Option<Migrator<P>>,
}

impl<P> SchemaVersion<P> {
    pub fn new(version: u32) -> Self {
        Self {
            version,
            create: None,
            migrate: None,
        }
    }

    pub fn with_create<F>(mut self, create: F) -> Self
    where
        F: Fn() -> P + Send + Sync + 'static,
    {
        self.create = Some(Arc::new(create));
        self
    }

    pub fn with_migrate<F>(mut self, migrate: F) -> Self
    where
        F: Fn(P, &mut MigrationContext<P>) -> Result<P, MigrationError>
            + Send
            + Sync
            + 'static,
    {
        self.migrate = Some(Arc::new(migrate));
        self
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn migrator(&self) -> Option<&Migrator<P>> {
        self.migrate.as_ref()
    }

    pub fn has_create(&self) -> bool {
        self.create.is_some()
    }
}

impl<P> Clone for SchemaVersion<P> {
    fn clone(&self) -> Self {
        Self {
            version: self.version,
            create: self.create.clone(),
            migrate: self.migrate.clone(),
        }
    }
}

impl<P> fmt::Debug for SchemaVersion<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaVersion")
            .field("version", &self.version)
            .field("create", &self.create.is_some())
            .field("migrate", &self.migrate.is_some())
            .finish()
    }
}

/// Validated, immutable list of schema versions `0..=latest`.
pub struct VersionChain<P> {
    versions: Arc<[SchemaVersion<P>]>,
    create: Initializer<P>,
}

impl<P> VersionChain<P> {
    pub fn builder() -> VersionChainBuilder<P> {
        VersionChainBuilder::default()
    }

    pub fn latest(&self) -> u32 {
        self.versions.last().map_or(0, SchemaVersion::version)
    }

    pub fn versions(&self) -> &[SchemaVersion<P>] {
        &self.versions
    }

    /// Canonical empty state at the latest version.
    pub fn create(&self) -> P {
        (self.create)()
    }

    /// Descriptors a payload stored at `stored` still has to pass through,
    /// in ascending order.
    pub fn pending(
        &self,
        stored: u32,
    ) -> impl Iterator<Item = &SchemaVersion<P>> {
        self.versions
            .iter()
            .filter(move |descriptor| descriptor.version > stored)
    }
}

impl<P> Clone for VersionChain<P> {
    fn clone(&self) -> Self {
        Self {
            versions: Arc::clone(&self.versions),
            create: Arc::clone(&self.create),
        }
    }
}

impl<P> fmt::Debug for VersionChain<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VersionChain")
            .field("versions", &self.versions)
            .finish()
    }
}

/// Accumulates descriptors; [`build`](Self::build) validates them.
pub struct VersionChainBuilder<P> {
    versions: Vec<SchemaVersion<P>>,
}

impl<P> Default for VersionChainBuilder<P> {
    fn default() -> Self {
        Self {
            versions: Vec::new(),
        }
    }
}

impl<P> fmt::Debug for VersionChainBuilder<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VersionChainBuilder")
            .field("versions", &self.versions)
            .finish()
    }
}

impl<P> VersionChainBuilder<P> {
    pub fn version(mut self, descriptor: SchemaVersion<P>) -> Self {
        self.versions.push(descriptor);
        self
    }

    pub fn build(self) -> Result<VersionChain<P>, ConfigurationError> {
        validate(&self.versions)?;

        let latest =
            self.versions.last().ok_or(ConfigurationError::EmptyChain)?;
        let create = latest.create.clone().ok_or(
            ConfigurationError::MissingCreate {
                latest: latest.version,
            },
        )?;

        Ok(VersionChain {
            versions: self.versions.into(),
            create,
        })
    }
}

fn validate<P>(
    versions: &[SchemaVersion<P>],
) -> Result<(), ConfigurationError> {
    let Some(first) = versions.first() else {
        return Err(ConfigurationError::EmptyChain);
    };
    if first.version != 0 {
        return Err(ConfigurationError::MustStartAtZero {
            found: first.version,
        });
    }

    for pair in versions.windows(2) {
        let (previous, found) = (pair[0].version, pair[1].version);
        if found == previous {
            return Err(ConfigurationError::Duplicate { version: found });
        }
        if found < previous {
            return Err(ConfigurationError::OutOfOrder { previous, found });
        }
        if found != previous + 1 {
            return Err(ConfigurationError::Gap { previous, found });
        }
    }

    let latest = versions.len() - 1;
    if let Some(misplaced) =
        versions[..latest].iter().find(|v| v.has_create())
    {
        return Err(ConfigurationError::MisplacedCreate {
            version: misplaced.version,
            latest: versions[latest].version,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain_of(versions: &[u32]) -> VersionChainBuilder<u32> {
        let last = versions.len().saturating_sub(1);
        versions
            .iter()
            .enumerate()
            .fold(VersionChain::builder(), |builder, (index, &version)| {
                let descriptor = SchemaVersion::new(version)
                    .with_migrate(move |_, _| Ok(version));
                if index == last {
                    builder.version(descriptor.with_create(move || version))
                } else {
                    builder.version(descriptor)
                }
            })
    }

    #[test]
    fn contiguous_versions_from_zero_build() {
        for len in 1..6u32 {
            let versions: Vec<u32> = (0..len).collect();
            let chain = chain_of(&versions).build().expect("valid chain");

            assert_eq!(chain.latest(), len - 1);
            assert_eq!(chain.create(), len - 1);
        }
    }

    #[test]
    fn rejects_malformed_sequences() {
        let cases: &[(&[u32], ConfigurationError)] = &[
            (&[], ConfigurationError::EmptyChain),
            (&[1, 2], ConfigurationError::MustStartAtZero { found: 1 }),
            (&[0, 1, 1], ConfigurationError::Duplicate { version: 1 }),
            (
                &[0, 2, 1],
                ConfigurationError::Gap {
                    previous: 0,
                    found: 2,
                },
            ),
            (
                &[0, 1, 3],
                ConfigurationError::Gap {
                    previous: 1,
                    found: 3,
                },
            ),
            (
                &[0, 2, 2, 1],
                ConfigurationError::Gap {
                    previous: 0,
                    found: 2,
                },
            ),
        ];

        for (versions, expected) in cases {
            let err = chain_of(versions).build().expect_err("invalid chain");
            assert_eq!(&err, expected, "versions {versions:?}");
        }
    }

    #[test]
    fn rejects_descending_versions() {
        let chain = VersionChain::builder()
            .version(SchemaVersion::new(0))
            .version(SchemaVersion::new(1))
            .version(SchemaVersion::new(0).with_create(|| 0u32))
            .build();

        assert_eq!(
            chain.expect_err("out of order"),
            ConfigurationError::OutOfOrder {
                previous: 1,
                found: 0
            }
        );
    }

    #[test]
    fn create_is_only_allowed_on_latest() {
        let misplaced = VersionChain::builder()
            .version(SchemaVersion::new(0).with_create(|| 0u32))
            .version(SchemaVersion::new(1).with_create(|| 1u32))
            .build();
        assert_eq!(
            misplaced.expect_err("misplaced create"),
            ConfigurationError::MisplacedCreate {
                version: 0,
                latest: 1
            }
        );

        let missing = VersionChain::<u32>::builder()
            .version(SchemaVersion::new(0))
            .version(SchemaVersion::new(1))
            .build();
        assert_eq!(
            missing.expect_err("missing create"),
            ConfigurationError::MissingCreate { latest: 1 }
        );
    }

    #[test]
    fn pending_lists_versions_after_stored() {
        let chain = chain_of(&[0, 1, 2, 3]).build().expect("valid chain");
        let pending: Vec<u32> =
            chain.pending(1).map(SchemaVersion::version).collect();

        assert_eq!(pending, vec![2, 3]);
    }
}

// CLI commands for bundling

use crate::bundler::{BundleSpec, BundleTarget, Bundler};
use anyhow::{Context, Result};
use clap::Subcommand;

/// Bundling subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum BundleCommands {
    /// Bundle one component from its entry point
    Component {
        /// Entry point relative to the source root (e.g., components/header/index.js)
        entry: String,
    },

    /// Bundle several components into one bundle
    Components {
        /// Component roots (e.g., components/header components/footer)
        #[arg(required = true)]
        roots: Vec<String>,

        /// Bundle name under the destination directory
        #[arg(long)]
        save_as: String,
    },

    /// Bundle components and vendor packages into one bundle
    Bundle {
        /// Component roots to include
        #[arg(short, long = "component")]
        components: Vec<String>,

        /// Vendor packages to include
        #[arg(short, long = "package")]
        packages: Vec<String>,

        /// Bundle name under the destination directory
        #[arg(long)]
        save_as: String,
    },

    /// Bundle one vendor package and its mapped dependencies
    Package {
        /// Package name as declared in the loader map (e.g., lodash)
        name: String,
    },

    /// Bundle several vendor packages into one bundle
    Packages {
        /// Package names
        #[arg(required = true)]
        names: Vec<String>,

        /// Bundle name (default: names joined with '+')
        #[arg(long)]
        save_as: Option<String>,
    },

    /// Bundle every component that has no bundle yet
    RemainingComponents,

    /// Bundle every installed jspm dependency that has no bundle yet
    RemainingPackages,

    /// Bundle remaining packages, then remaining components, then save the configuration
    All,

    /// Print the loader configuration as it would be saved
    ShowConfig,
}

impl BundleCommands {
    /// Whether the command persists the loader configuration on its own
    pub fn always_saves(&self) -> bool {
        matches!(self, BundleCommands::All)
    }

    /// Execute the command against `bundler`
    pub async fn run(self, bundler: &Bundler) -> Result<()> {
        match self {
            BundleCommands::Component { entry } => {
                let written = bundler
                    .bundle_component(&entry)
                    .await
                    .with_context(|| format!("bundling component {entry}"))?;
                report(written.as_slice());
            }
            BundleCommands::Components { roots, save_as } => {
                let written = bundler
                    .bundle_components(&roots, &save_as)
                    .await
                    .with_context(|| format!("bundling components into {save_as}"))?;
                report(written.as_slice());
            }
            BundleCommands::Bundle {
                components,
                packages,
                save_as,
            } => {
                let spec = BundleSpec {
                    components,
                    packages,
                };
                let written = bundler
                    .bundle(&spec, &save_as)
                    .await
                    .with_context(|| format!("bundling {save_as}"))?;
                report(written.as_slice());
            }
            BundleCommands::Package { name } => {
                let written = bundler
                    .bundle_package(&name)
                    .await
                    .with_context(|| format!("bundling package {name}"))?;
                report(written.as_slice());
            }
            BundleCommands::Packages { names, save_as } => {
                let written = bundler
                    .bundle_packages(&names, save_as.as_deref())
                    .await
                    .with_context(|| format!("bundling packages {}", names.join(", ")))?;
                report(written.as_slice());
            }
            BundleCommands::RemainingComponents => {
                let written = bundler
                    .bundle_remaining_components()
                    .await
                    .context("bundling remaining components")?;
                report(&written);
            }
            BundleCommands::RemainingPackages => {
                let written = bundler
                    .bundle_remaining_packages()
                    .await
                    .context("bundling remaining packages")?;
                report(&written);
            }
            BundleCommands::All => {
                let packages = bundler
                    .bundle_remaining_packages()
                    .await
                    .context("bundling remaining packages")?;
                let components = bundler
                    .bundle_remaining_components()
                    .await
                    .context("bundling remaining components")?;
                report(&packages);
                report(&components);
            }
            BundleCommands::ShowConfig => {
                print!("{}", bundler.render_state().await?);
            }
        }

        Ok(())
    }
}

fn report(written: &[BundleTarget]) {
    if written.is_empty() {
        println!("Nothing to bundle.");
        return;
    }

    for target in written {
        println!("✓ {} -> {}", target.id, target.path().display());
    }
}

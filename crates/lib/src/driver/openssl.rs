//! OpenSSL: `Configure` script plus `make`.

use super::{BuildStep, Dependencies, DriverError, LibraryDriver};
use crate::context::BuildContext;
use crate::library::Library;
use crate::platform::{Architecture, matrix};
use crate::process::Invocation;
use crate::target::Target;
use crate::tools::Tool;

/// Static-only, minimal-surface options passed to `Configure`.
const CONFIGURE_OPTIONS: [&str; 6] = ["no-shared", "no-dso", "no-apps", "no-docs", "no-ui-console", "zlib"];

#[derive(Debug, Default, Clone, Copy)]
pub struct OpenSslDriver;

impl LibraryDriver for OpenSslDriver {
  fn library(&self) -> Library {
    Library::OpenSsl
  }

  fn configure(&self, ctx: &BuildContext, target: &Target, _deps: &Dependencies) -> Result<BuildStep, DriverError> {
    let paths = target.paths(&ctx.work_root);
    let architecture = single_architecture(target)?;
    let openssl_target = matrix::openssl_target(target.platform(), architecture)?;

    let configure = Invocation::new(paths.source.join("Configure"))
      .arg(openssl_target)
      .args(CONFIGURE_OPTIONS)
      .arg(format!("--prefix={}", paths.install.display()))
      .current_dir(&paths.build);

    Ok(BuildStep::new("configure", configure))
  }

  fn build_steps(&self, ctx: &BuildContext, target: &Target) -> Result<Vec<BuildStep>, DriverError> {
    let build_dir = target.paths(&ctx.work_root).build;
    let make = ctx.services.tools.locate(Tool::Make)?;

    let build = Invocation::new(&make)
      .args(["-j".to_string(), ctx.parallelism.to_string(), "build_libs".to_string()])
      .current_dir(&build_dir);
    let install = Invocation::new(&make)
      .named("make install_sw")
      .arg("install_sw")
      .current_dir(&build_dir);

    Ok(vec![BuildStep::new("build", build), BuildStep::new("install", install)])
  }
}

fn single_architecture(target: &Target) -> Result<Architecture, DriverError> {
  match target.architectures() {
    [architecture] => Ok(*architecture),
    other => Err(DriverError::NotSingleArchitecture {
      target: target.to_string(),
      count: other.len(),
    }),
  }
}

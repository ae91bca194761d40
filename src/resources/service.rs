//! runit service enablement.
use anyhow::{Context as _, Result};
use std::io;
use std::path::Path;

use super::{ResourceChange, ResourceError, ensure_symlink};
use crate::operations::EntryKind;
use crate::stages::Context;

/// Directory holding runit service definitions, as seen from inside the system.
pub const SERVICE_DIR: &str = "/etc/sv";

/// The default runlevel's directory of enabled service links.
pub const RUNSVDIR_DEFAULT: &str = "/etc/runit/runsvdir/default";

/// Enable runit service `name` in the default runlevel.
///
/// The definition must already exist at `<root>/etc/sv/<name>`. The link
/// created in the runlevel directory stores the in-system path so it still
/// resolves once the provisioned root is booted.
///
/// # Errors
///
/// Returns [`ResourceError::ServiceNotFound`] or
/// [`ResourceError::NotADirectory`] when the definition is unusable, a
/// [`ResourceError::Conflict`] if something other than a symlink already
/// sits at the link path, or any filesystem error.
pub fn enable_service(ctx: &Context, name: &str) -> Result<ResourceChange> {
    let definition = Path::new(SERVICE_DIR).join(name);
    let definition_in_root = ctx.in_root(&definition);
    match ctx.fs_ops.entry_kind(&definition_in_root) {
        Ok(EntryKind::Directory) => {}
        Ok(kind) => {
            return Err(ResourceError::NotADirectory {
                path: definition_in_root,
                kind,
            }
            .into());
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(ResourceError::ServiceNotFound {
                service: name.to_string(),
                path: definition_in_root,
            }
            .into());
        }
        Err(e) => {
            return Err(e).with_context(|| format!("checking {}", definition_in_root.display()));
        }
    }

    let runlevel = ctx.in_root(RUNSVDIR_DEFAULT);
    match ctx.fs_ops.entry_kind(&runlevel) {
        Ok(EntryKind::Directory) => {}
        Ok(kind) => {
            return Err(ResourceError::NotADirectory {
                path: runlevel,
                kind,
            }
            .into());
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            ctx.fs_ops.create_dir_all(&runlevel, 0o755)?;
        }
        Err(e) => {
            return Err(e).with_context(|| format!("checking {}", runlevel.display()));
        }
    }

    let change = ensure_symlink(ctx, &definition, &runlevel.join(name), false)?;
    if change == ResourceChange::AlreadyCorrect {
        ctx.log.debug(&format!("service {name} already enabled"));
    } else {
        ctx.log.info(&format!("enabled service {name}"));
    }
    Ok(change)
}

//! Read-only proc entry with fixed content.
//!
//! Unlike the register devices, a read past the end keeps returning 0:
//! the cursor is never rewound, so each session sees the content once.

use regdev_core::error::RegResult;
use regdev_core::id::SessionIds;
use regdev_core::kinfo;
use regdev_core::session::Session;
use regdev_core::traits::CharDevice;

/// Content served by the default entry, terminator included
pub const HELLO: &[u8] = b"HelloWorld!\n\0";

pub struct ProcEntry {
    name: String,
    content: &'static [u8],
    ids: SessionIds,
}

impl ProcEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_content(name, HELLO)
    }

    pub fn with_content(name: impl Into<String>, content: &'static [u8]) -> Self {
        Self {
            name: name.into(),
            content,
            ids: SessionIds::new(),
        }
    }

    pub fn path(&self) -> String {
        format!("/proc/{}", self.name)
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

impl CharDevice for ProcEntry {
    fn name(&self) -> &str {
        &self.name
    }

    fn sessions(&self) -> &SessionIds {
        &self.ids
    }

    fn open(&self) -> RegResult<Session<'_>> {
        Ok(Session::shared(&self.ids))
    }

    fn read(&self, session: &mut Session<'_>, buf: &mut [u8]) -> RegResult<usize> {
        session.ensure_owned(&self.ids)?;

        let offset = session.cursor().offset();
        if offset >= self.content.len() || buf.is_empty() {
            return Ok(0);
        }
        let n = (self.content.len() - offset).min(buf.len());
        buf[..n].copy_from_slice(&self.content[offset..offset + n]);
        session.cursor_mut().advance(n);
        kinfo!("procfile read {}", self.name);
        Ok(n)
    }
}

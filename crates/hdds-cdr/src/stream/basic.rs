// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Classic CDR: positional members, no framing, 8-byte alignment.

use super::stack::Frame;
use super::{impl_core_deref, CdrStream, Encoding, StreamConfig, StreamCore, StreamMode};
use crate::error::{Fault, Result};
use crate::props::{EntityProperties, Extensibility};

/// Basic CDR stream (no XTypes extensions).
///
/// Mutable types and optional members cannot be represented; encountering
/// them raises `UNSUPPORTED_XTYPES`.
#[derive(Debug)]
pub struct BasicCdrStream<'b> {
    core: StreamCore<'b>,
}

impl_core_deref!(BasicCdrStream);

impl BasicCdrStream<'_> {
    pub fn new(config: StreamConfig) -> Self {
        Self {
            core: StreamCore::new(8, config),
        }
    }
}

impl Default for BasicCdrStream<'_> {
    fn default() -> Self {
        Self::new(StreamConfig::default())
    }
}

impl<'b> CdrStream<'b> for BasicCdrStream<'b> {
    const ENCODING: Encoding = Encoding::Basic;

    fn with_config(config: StreamConfig) -> Self {
        Self::new(config)
    }

    fn start_struct(&mut self, props: &EntityProperties) -> Result<()> {
        self.ensure_usable()?;
        if !self.is_key() && props.e_ext == Extensibility::Mutable {
            self.raise(Fault::UNSUPPORTED_XTYPES)?;
        }
        let position = self.position();
        self.push_frame(Frame::at(position), false)
    }

    fn finish_struct(&mut self, _props: &EntityProperties) -> Result<()> {
        self.pop_frame();
        self.ensure_usable()
    }

    fn start_member(&mut self, prop: &EntityProperties, present: bool) -> Result<bool> {
        self.ensure_usable()?;
        if !self.is_key() && prop.is_optional {
            self.raise(Fault::UNSUPPORTED_XTYPES)?;
        }
        Ok(self.mode() == StreamMode::Read || present)
    }

    fn finish_member(&mut self, _prop: &EntityProperties, _present: bool) -> Result<()> {
        self.ensure_usable()
    }
}

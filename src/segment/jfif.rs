//! APP0/JFIF segment. Carries image parameters, not metadata, so loading
//! stops after the identifier.

use std::io::{Read, Seek, SeekFrom};
use std::rc::Rc;

use tracing::debug;

use crate::error::Result;
use crate::reader::{Loaded, SharedStream};
use crate::segment::{read_identifier, SegmentDescriptor};

#[derive(Debug)]
pub struct JfifSegment<R> {
    stream: SharedStream<R>,
    descriptor: SegmentDescriptor,
    identifier: Loaded<String>,
}

impl<R: Read + Seek> JfifSegment<R> {
    pub(crate) fn new(descriptor: SegmentDescriptor, stream: &SharedStream<R>) -> Self {
        JfifSegment {
            stream: Rc::clone(stream),
            descriptor,
            identifier: Loaded::Unloaded,
        }
    }

    pub fn descriptor(&self) -> &SegmentDescriptor {
        &self.descriptor
    }

    pub fn is_loaded(&self) -> bool {
        self.identifier.is_loaded()
    }

    /// The identifier at the head of the payload, `"JFIF"` in well-formed
    /// files. Read on first access.
    pub fn identifier(&mut self) -> Result<&str> {
        if !self.identifier.is_loaded() {
            self.identifier = match self.read_name() {
                Ok(name) => Loaded::Loaded(name),
                Err(err) => Loaded::Failed(err),
            };
        }
        match &self.identifier {
            Loaded::Loaded(name) => Ok(name),
            Loaded::Failed(err) => Err(err.clone()),
            Loaded::Unloaded => unreachable!("identifier load settles the state"),
        }
    }

    fn read_name(&self) -> Result<String> {
        let mut s = self.stream.borrow_mut();
        s.seek(SeekFrom::Start(self.descriptor.payload_offset()))?;
        let name = read_identifier(&mut *s)?;
        debug!(segment = %self.descriptor.marker, %name, "segment loaded");
        Ok(name)
    }
}

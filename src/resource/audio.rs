use std::rc::Rc;

use futures::FutureExt;

use crate::error::LoadError;
use crate::platform::{AudioDevice, DecodedAudio, MediaLoader, SampleId};

use super::source::Source;
use super::{LoadFuture, LoadOutcome};

#[derive(Debug)]
pub struct AudioResource {
    source: Source,
    decoded: Option<DecodedAudio>,
    sample: Option<SampleId>,
}

impl AudioResource {
    pub(super) fn new(source: Source) -> Self {
        Self {
            source,
            decoded: None,
            sample: None,
        }
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    pub fn sample(&self) -> Option<SampleId> {
        self.sample
    }

    pub(super) fn load(&self, loader: Rc<dyn MediaLoader>) -> LoadFuture {
        loader
            .load_audio(self.source.path())
            .map(|result| match result {
                Ok(audio) => LoadOutcome::Audio(audio),
                Err(err) => LoadOutcome::Failed(err),
            })
            .boxed_local()
    }

    pub(super) fn set_decoded(&mut self, audio: DecodedAudio) {
        self.decoded = Some(audio);
    }

    pub(super) fn attach(&mut self, device: &mut dyn AudioDevice) -> Result<(), LoadError> {
        let decoded = self
            .decoded
            .take()
            .ok_or_else(|| LoadError::InvalidData("audio has no decoded data".into()))?;
        self.sample = Some(device.create_sample(&decoded)?);
        Ok(())
    }

    pub(super) fn detach(&mut self, device: Option<&mut dyn AudioDevice>) {
        if let (Some(sample), Some(device)) = (self.sample.take(), device) {
            device.destroy_sample(sample);
        }
        self.decoded = None;
    }

    pub(super) fn clear(&mut self) {
        self.decoded = None;
    }
}

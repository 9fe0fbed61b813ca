use anyhow::Result;
use log::info;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::{Duration, Instant};

/// Wall-clock position tracking that ignores time spent paused.
#[derive(Debug, Default)]
struct PlayClock {
    elapsed: Duration,
    resumed_at: Option<Instant>,
}

impl PlayClock {
    fn resume(&mut self) {
        if self.resumed_at.is_none() {
            self.resumed_at = Some(Instant::now());
        }
    }

    fn pause(&mut self) {
        if let Some(started) = self.resumed_at.take() {
            self.elapsed += started.elapsed();
        }
    }

    fn reset(&mut self) {
        *self = Self::default();
    }

    fn position(&self) -> Duration {
        self.elapsed + self.resumed_at.map_or(Duration::ZERO, |started| started.elapsed())
    }
}

/// Plays one file through the default output device.
pub struct AudioPlayback {
    #[allow(dead_code)]
    stream: OutputStream,
    stream_handle: OutputStreamHandle,
    sink: Option<Sink>,
    clock: PlayClock,
}

impl AudioPlayback {
    pub fn new() -> Result<Self> {
        let (stream, stream_handle) = OutputStream::try_default()?;

        Ok(Self {
            stream,
            stream_handle,
            sink: None,
            clock: PlayClock::default(),
        })
    }

    /// Queue `path` paused; call `play` to start.
    pub fn load_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let file = BufReader::new(File::open(&path)?);
        let source = Decoder::new(file)?;

        let sink = Sink::try_new(&self.stream_handle)?;
        sink.append(source);
        sink.pause();

        info!("Loaded audio file: {:?}", path.as_ref());
        self.sink = Some(sink);
        self.clock.reset();

        Ok(())
    }

    pub fn play(&mut self) {
        if let Some(sink) = &self.sink {
            sink.play();
            self.clock.resume();
            info!("Audio playback started");
        }
    }

    pub fn pause(&mut self) {
        if let Some(sink) = &self.sink {
            sink.pause();
            self.clock.pause();
            info!("Audio playback paused");
        }
    }

    pub fn stop(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
            self.clock.reset();
            info!("Audio playback stopped");
        }
    }

    pub fn set_volume(&self, volume: f32) {
        if let Some(sink) = &self.sink {
            sink.set_volume(volume.clamp(0.0, 1.0));
        }
    }

    pub fn is_playing(&self) -> bool {
        self.sink.as_ref().map_or(false, |sink| !sink.is_paused())
    }

    pub fn is_finished(&self) -> bool {
        self.sink.as_ref().map_or(true, |sink| sink.empty())
    }

    /// Time spent playing since the file was loaded.
    pub fn position(&self) -> Duration {
        self.clock.position()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_clock_ignores_paused_time() {
        let mut clock = PlayClock::default();
        assert_eq!(clock.position(), Duration::ZERO);

        clock.resume();
        thread::sleep(Duration::from_millis(20));
        clock.pause();
        let paused_at = clock.position();
        assert!(paused_at >= Duration::from_millis(20));

        thread::sleep(Duration::from_millis(20));
        assert_eq!(clock.position(), paused_at);

        clock.resume();
        clock.resume();
        thread::sleep(Duration::from_millis(5));
        assert!(clock.position() > paused_at);

        clock.reset();
        assert_eq!(clock.position(), Duration::ZERO);
    }
}

use std::path::{Path, PathBuf};

use crate::shared::constants::frame_file_name;
use crate::shared::error::AnalysisError;
use crate::shared::frame::Frame;
use crate::shared::frame_file::FrameFile;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::image_writer::ImageWriter;
use crate::video::domain::video_asset::VideoAsset;
use crate::video::domain::video_reader::VideoReader;

type DecodedFrames<'a> = Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + 'a>;

/// Decodes a video and materializes each frame as `frame{N}.jpg`.
pub struct FrameExtractor {
    reader: Box<dyn VideoReader>,
    image_writer: Box<dyn ImageWriter>,
    source: Option<PathBuf>,
}

impl FrameExtractor {
    pub fn new(reader: Box<dyn VideoReader>, image_writer: Box<dyn ImageWriter>) -> Self {
        Self {
            reader,
            image_writer,
            source: None,
        }
    }

    /// Opens the video for decoding. An unreadable container is a decode
    /// failure.
    pub fn open(&mut self, video: &VideoAsset) -> Result<VideoMetadata, AnalysisError> {
        let metadata = self
            .reader
            .open(video.path())
            .map_err(|e| AnalysisError::Decode {
                path: video.path().to_path_buf(),
                message: e.to_string(),
            })?;
        self.source = Some(video.path().to_path_buf());
        Ok(metadata)
    }

    /// Returns the lazy, single-pass sequence of frame files written under
    /// `output_dir` (created if absent).
    pub fn frames(&mut self, output_dir: &Path) -> Result<FrameFiles<'_>, AnalysisError> {
        std::fs::create_dir_all(output_dir).map_err(|e| AnalysisError::io(output_dir, e))?;
        Ok(FrameFiles {
            frames: self.reader.frames(),
            image_writer: self.image_writer.as_ref(),
            output_dir: output_dir.to_path_buf(),
            source: self.source.clone().unwrap_or_default(),
            emitted: 0,
            done: false,
        })
    }

    pub fn close(&mut self) {
        self.reader.close();
        self.source = None;
    }
}

/// Iterator over extracted frame files.
///
/// A decode error after at least one frame ends the sequence quietly with
/// the frames captured so far; before the first frame it is yielded as
/// [`AnalysisError::Decode`]. A failed image write is yielded as
/// [`AnalysisError::Io`] and also ends the sequence.
pub struct FrameFiles<'a> {
    frames: DecodedFrames<'a>,
    image_writer: &'a dyn ImageWriter,
    output_dir: PathBuf,
    source: PathBuf,
    emitted: usize,
    done: bool,
}

impl FrameFiles<'_> {
    /// Number of frame files produced so far.
    pub fn emitted(&self) -> usize {
        self.emitted
    }
}

impl Iterator for FrameFiles<'_> {
    type Item = Result<FrameFile, AnalysisError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let frame = match self.frames.next() {
            None => {
                self.done = true;
                return None;
            }
            Some(Err(e)) => {
                self.done = true;
                if self.emitted == 0 {
                    return Some(Err(AnalysisError::Decode {
                        path: self.source.clone(),
                        message: e.to_string(),
                    }));
                }
                log::warn!(
                    "Decoding stopped after {} frames, continuing with those: {e}",
                    self.emitted
                );
                return None;
            }
            Some(Ok(frame)) => frame,
        };

        let path = self.output_dir.join(frame_file_name(frame.index()));
        if let Err(e) = self.image_writer.write(&path, &frame) {
            self.done = true;
            return Some(Err(AnalysisError::io(
                path,
                std::io::Error::other(e.to_string()),
            )));
        }

        self.emitted += 1;
        Some(Ok(FrameFile {
            index: frame.index(),
            path,
        }))
    }
}

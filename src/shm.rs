//! Shared-memory pixel storage
//!
//! A buffer is backed by an anonymous memfd that is truncated to the frame
//! size and mapped read-write. The descriptor is only needed until the
//! compositor has been handed the pool; the mapping keeps the memory alive.

use crate::error::ClientError;
use log::debug;
use memmap2::MmapMut;
use std::ffi::CString;
use std::fs::File;
use std::io;
use std::os::fd::{AsFd, BorrowedFd, FromRawFd, OwnedFd};

/// Bytes per `ARGB8888` pixel
pub const BYTES_PER_PIXEL: u32 = 4;

/// Layout of one `ARGB8888` frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferGeometry {
    pub width: u32,
    pub height: u32,
    pub stride: u32,
    pub size: usize,
}

impl BufferGeometry {
    pub fn new(width: u32, height: u32) -> Self {
        let stride = width.saturating_mul(BYTES_PER_PIXEL);
        Self {
            width,
            height,
            stride,
            size: (stride as usize).saturating_mul(height as usize),
        }
    }

    /// Fails for empty frames and for frames the protocol's `int` arguments
    /// cannot describe
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.width == 0 || self.height == 0 {
            return Err(ClientError::ResourceAllocation {
                what: "shm buffer",
                source: io::Error::new(io::ErrorKind::InvalidInput, "empty buffer geometry"),
            });
        }
        if self.size > i32::MAX as usize {
            return Err(ClientError::ResourceAllocation {
                what: "shm buffer",
                source: io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("{}x{} frame does not fit a shm pool", self.width, self.height),
                ),
            });
        }
        Ok(())
    }
}

/// Anonymous memory region mapped into this process
#[derive(Debug)]
pub struct ShmRegion {
    geometry: BufferGeometry,
    fd: Option<OwnedFd>,
    map: MmapMut,
}

impl ShmRegion {
    /// Creates, sizes and maps a memfd for `geometry`
    pub fn allocate(geometry: BufferGeometry) -> Result<Self, ClientError> {
        geometry.validate()?;

        let fd = create_memfd("waysnitch-shm")?;
        let file = File::from(fd);
        file.set_len(geometry.size as u64)
            .map_err(|source| ClientError::ResourceAllocation {
                what: "shm truncate",
                source,
            })?;

        // SAFETY: the memfd is private to this process until it is shared with
        // the compositor, and the file is never truncated after mapping.
        let map = unsafe { MmapMut::map_mut(&file) }.map_err(|source| {
            ClientError::ResourceAllocation {
                what: "shm mapping",
                source,
            }
        })?;

        debug!(
            "Allocated shm region {}x{} (stride={}, {} bytes)",
            geometry.width, geometry.height, geometry.stride, geometry.size
        );

        Ok(Self {
            geometry,
            fd: Some(OwnedFd::from(file)),
            map,
        })
    }

    pub fn geometry(&self) -> BufferGeometry {
        self.geometry
    }

    /// The backing descriptor, until [`ShmRegion::close_fd`] is called
    pub fn fd(&self) -> Option<BorrowedFd<'_>> {
        self.fd.as_ref().map(|fd| fd.as_fd())
    }

    /// Closes the descriptor once the pool exists; the mapping stays valid
    pub fn close_fd(&mut self) {
        if self.fd.take().is_some() {
            debug!("Closed shm descriptor");
        }
    }

    pub fn pixels(&self) -> &[u8] {
        &self.map[..]
    }

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.map[..]
    }
}

fn create_memfd(name: &str) -> Result<OwnedFd, ClientError> {
    let name = CString::new(name).map_err(|e| ClientError::ResourceAllocation {
        what: "memfd",
        source: io::Error::new(io::ErrorKind::InvalidInput, e),
    })?;

    let fd = unsafe { libc::memfd_create(name.as_ptr(), libc::MFD_CLOEXEC) };
    if fd < 0 {
        return Err(ClientError::ResourceAllocation {
            what: "memfd",
            source: io::Error::last_os_error(),
        });
    }

    // SAFETY: memfd_create returned a fresh descriptor owned by nobody else.
    Ok(unsafe { OwnedFd::from_raw_fd(fd) })
}

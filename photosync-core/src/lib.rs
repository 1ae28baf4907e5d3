mod client;
mod session;

pub use client::{
    ApiErrorClass, DEFAULT_BASE_URL, Photo, PhotoLibraryClient, PhotoLibraryError, PhotoPage,
};
pub use session::{Session, SessionClient, SessionError, TrustedDevice};

//! # heraldspotify - Client de l'API Web Spotify pour Herald
//!
//! Cette crate lit l'état du player Spotify et commande le volume de
//! l'appareil actif. Elle implémente le trait
//! [`heraldcore::PlaybackSource`] au travers de [`SpotifySession`].
//!
//! ## Autorisation
//!
//! ```rust,ignore
//! use heraldconfig::Config;
//! use heraldspotify::{SpotifyApi, SpotifyConfigExt, extract_code};
//!
//! let config = Config::load_config("")?;
//! let credentials = config.get_spotify_credentials()?;
//! let mut api = SpotifyApi::new();
//! println!("Open {}", api.authorize_url(&credentials)?);
//! // ... l'utilisateur colle l'URL de redirection ...
//! let auth = api.exchange_code(&credentials, &extract_code(&pasted)?)?;
//! config.set_spotify_auth_info(&auth)?;
//! ```
//!
//! ## Lecture du player
//!
//! ```rust,ignore
//! use heraldspotify::SpotifySession;
//!
//! let mut session = SpotifySession::open(&config)?;
//! if let Some(state) = session.playback()? {
//!     println!("{:?}", state.to_snapshot());
//! }
//! session.close();
//! ```

pub mod api;
pub mod config_ext;
pub mod error;
pub mod models;
pub mod session;

pub use api::SpotifyApi;
pub use api::auth::{
    AuthInfo, ClientCredentials, DEFAULT_REDIRECT_URI, SCOPES, extract_code, unix_now,
};
pub use config_ext::SpotifyConfigExt;
pub use error::{Result, SpotifyError};
pub use models::PlaybackState;
pub use session::SpotifySession;

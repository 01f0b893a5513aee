// Music adapters: yt-dlp search, Spotify catalog lookup and the songbird voice link.

pub mod songbird_link;
pub mod spotify_client;
pub mod ytdlp_resolver;

pub use songbird_link::SongbirdVoiceLink;
pub use spotify_client::SpotifyClient;
pub use ytdlp_resolver::YtDlpResolver;

//! Relay engine: companion channel, HTTP fallback, routing and page scanning.
mod channel;
mod config_store;
mod frame;
mod http;
mod native_host;
mod persist;
mod relay;
mod router;
mod scanner;

pub use channel::{
    BoxedReader, BoxedWriter, ChannelConnector, ChannelError, ChannelLink, ChannelManager,
    ChannelSettings, ChannelState,
};
pub use config_store::{load_or_default, ConfigHandle, ConfigStorage, RonConfigStorage, StoreError};
pub use frame::{read_frame, write_frame, FrameError, MAX_INBOUND_FRAME};
pub use http::{DeliveryError, DeliveryFailureKind, DeliverySettings, HttpDelivery};
pub use native_host::{
    manifest_search_dirs, ManifestError, NativeHostConnector, NativeHostManifest,
    COMPANION_HOST_NAME,
};
pub use persist::write_atomically;
pub use relay::{DownloadSource, HostControl, Relay, RelayEvent};
pub use router::{Router, RouterSettings};
pub use scanner::{MediaAugmenter, MediaControl, PageScanner};

/// Content type of offer and answer bodies on the WHIP/WHEP endpoints
pub const SDP_CONTENT_TYPE: &str = "application/sdp";

pub const API_PREFIX: &str = "/api/v1";

/// Publish endpoint (WHIP)
pub const WHIP_PATH: &str = "/api/v1/ingest/whip";

/// Playback endpoint (WHEP)
pub const WHEP_PATH: &str = "/api/v1/ingest/whep";

/// Directory of live streams
pub const STREAMS_PATH: &str = "/api/v1/ingest/streams";

/// Query parameter carrying the stream identifier on playback requests
pub const STREAM_ID_QUERY: &str = "stream_id";

/// Resource URL returned in the `Location` header of a successful publish.
/// Deleting it ends the stream.
pub fn whip_resource(stream_id: &str) -> String {
    format!("{}/{}", WHIP_PATH, stream_id)
}

/// Playback URL for a stream identifier
pub fn whep_resource(stream_id: &str) -> String {
    format!("{}/{}", WHEP_PATH, stream_id)
}

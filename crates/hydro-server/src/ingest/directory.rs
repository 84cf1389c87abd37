use super::IngestService;
use hydro_protocol::StreamInfo;

impl IngestService {
    /// Snapshot of the live streams, oldest first
    pub async fn list_streams(&self) -> Vec<StreamInfo> {
        self.registry.list().await
    }
}

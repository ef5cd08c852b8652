//! Photo upload rows created on confirm.

use async_trait::async_trait;

use crate::domain::photos::PhotoUpload;
use crate::domain::ports::StoreError;
use crate::domain::UserId;

#[async_trait]
pub trait PhotoUploadTx: Send {
    async fn find_photo_upload_by_key(
        &mut self,
        user_id: UserId,
        temp_object_key: &str,
    ) -> Result<Option<PhotoUpload>, StoreError>;

    async fn insert_photo_upload(&mut self, upload: &PhotoUpload) -> Result<(), StoreError>;
}

use anyhow::Result;
use mimi_contracts::alert::Alert;
use mimi_contracts::describe::{
    CameraPermission, DescribeState, DescribeView, DESCRIBE_ALERT_TITLE, DESCRIBE_PROMPT,
};
use mimi_contracts::error::ScreenError;
use serde_json::json;
use sha2::{Digest, Sha256};

use super::{map_object, ScreenContext};
use crate::camera::PhotoSource;
use crate::client::{error_chain_text, GenerateRequest, InlineImage};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescribeOutcome {
    Described(Alert),
    /// Capture or model call failed; logged, nothing to show.
    Failed { error: String },
}

pub struct DescribeScreen {
    state: DescribeState,
    camera: Box<dyn PhotoSource>,
    ctx: ScreenContext,
    sizes_logged: bool,
}

impl DescribeScreen {
    pub fn new(ctx: ScreenContext, camera: Box<dyn PhotoSource>) -> Self {
        let mut state = DescribeState::new();
        state.set_permission(camera.permission());
        Self {
            state,
            camera,
            ctx,
            sizes_logged: false,
        }
    }

    pub fn state(&self) -> &DescribeState {
        &self.state
    }

    pub fn view(&self) -> DescribeView {
        self.state.view()
    }

    pub fn model(&self) -> &str {
        &self.ctx.model
    }

    pub fn set_context(&mut self, ctx: ScreenContext) {
        self.ctx = ctx;
    }

    /// Points the screen at another camera. Permission starts over.
    pub fn set_camera(&mut self, camera: Box<dyn PhotoSource>) -> Result<CameraPermission> {
        if self.state.is_loading() {
            return Err(ScreenError::CaptureInProgress.into());
        }
        self.camera = camera;
        self.sizes_logged = false;
        Ok(self.request_permission())
    }

    pub fn request_permission(&mut self) -> CameraPermission {
        let permission = self.camera.request_permission();
        if self.state.set_permission(permission) {
            tracing::info!(permission = permission.as_str(), "camera permission changed");
            self.ctx.record(
                "permission_changed",
                map_object(json!({ "permission": permission.as_str() })),
            );
        }
        permission
    }

    /// Shoots, sends the photo with the describe prompt and returns the alert.
    /// The loading flag is cleared on every path out.
    pub fn take_photo(&mut self) -> Result<DescribeOutcome> {
        let ticket = self.state.begin_capture()?;
        let result = self.capture_and_describe();
        self.state.finish_capture(ticket)?;

        match result {
            Ok(alert) => Ok(DescribeOutcome::Described(alert)),
            Err(err) => {
                let error = error_chain_text(&err, 512);
                tracing::error!(model = %self.ctx.model, "describe failed: {error}");
                self.ctx.record(
                    "description_failed",
                    map_object(json!({
                        "model": self.ctx.model,
                        "error": error,
                    })),
                );
                Ok(DescribeOutcome::Failed { error })
            }
        }
    }

    fn capture_and_describe(&mut self) -> Result<Alert> {
        if !self.sizes_logged {
            self.sizes_logged = true;
            tracing::debug!(
                sizes = ?self.camera.available_picture_sizes(),
                "available picture sizes"
            );
        }

        let photo = self.camera.take_picture()?;
        self.ctx.record(
            "photo_captured",
            map_object(json!({
                "mime_type": photo.mime_type,
                "width": photo.width,
                "height": photo.height,
                "bytes": photo.bytes.len(),
                "sha256": hex::encode(Sha256::digest(&photo.bytes)),
            })),
        );

        let request = GenerateRequest::new(self.ctx.model.clone(), DESCRIBE_PROMPT)
            .with_image(InlineImage::from(photo));
        let response = self.ctx.client.generate(&request)?;
        let text = response.text.trim().to_string();
        self.ctx.record(
            "description_received",
            map_object(json!({
                "model": response.model,
                "finish_reason": response.finish_reason,
                "chars": text.chars().count(),
            })),
        );
        Ok(Alert::titled(DESCRIBE_ALERT_TITLE, text))
    }
}

#[cfg(test)]
mod tests {
    use anyhow::{bail, Result};
    use mimi_contracts::alert::Alert;
    use mimi_contracts::describe::{
        CameraPermission, CapturedPhoto, DescribeView, DESCRIBE_PROMPT, PERMISSION_MESSAGE,
    };
    use mimi_contracts::error::ScreenError;
    use mimi_contracts::events::EventWriter;

    use super::{DescribeOutcome, DescribeScreen};
    use crate::camera::PhotoSource;
    use crate::screens::testing::{context, event_types, unwritable_events, ScriptedClient};

    struct FakeCamera {
        permission: CameraPermission,
        grants: bool,
        broken: bool,
    }

    impl FakeCamera {
        fn new(grants: bool) -> Self {
            Self {
                permission: CameraPermission::Unknown,
                grants,
                broken: false,
            }
        }
    }

    impl PhotoSource for FakeCamera {
        fn permission(&self) -> CameraPermission {
            self.permission
        }

        fn request_permission(&mut self) -> CameraPermission {
            self.permission = if self.grants {
                CameraPermission::Granted
            } else {
                CameraPermission::Denied
            };
            self.permission
        }

        fn take_picture(&mut self) -> Result<CapturedPhoto> {
            if self.broken {
                bail!("lens cap is on");
            }
            Ok(CapturedPhoto {
                bytes: vec![0xff, 0xd8, 0xff, 0xd9],
                mime_type: "image/jpeg".to_string(),
                width: 4,
                height: 3,
            })
        }
    }

    #[test]
    fn described_photo_becomes_alert() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let events = EventWriter::new(temp.path().join("events.jsonl"), "s-1");
        let client = ScriptedClient::new(vec![Ok(" A cat toy on a rug. ")]);
        let mut screen = DescribeScreen::new(
            context(&client, events.clone()),
            Box::new(FakeCamera::new(true)),
        );
        assert_eq!(screen.view(), DescribeView::Blank);

        assert_eq!(screen.request_permission(), CameraPermission::Granted);
        assert_eq!(screen.view(), DescribeView::Camera { loading: false });

        let outcome = screen.take_photo()?;
        assert_eq!(
            outcome,
            DescribeOutcome::Described(Alert::titled("What is this?", "A cat toy on a rug."))
        );
        assert!(!screen.state().is_loading());

        let requests = client.requests();
        assert_eq!(requests[0].prompt, DESCRIBE_PROMPT);
        let image = requests[0].image.as_ref().expect("image attached");
        assert_eq!(image.mime_type, "image/jpeg");
        assert_eq!(
            event_types(&events),
            vec!["permission_changed", "photo_captured", "description_received"]
        );
        Ok(())
    }

    #[test]
    fn denied_permission_blocks_capture_until_granted() -> anyhow::Result<()> {
        let client = ScriptedClient::new(vec![Ok("A window.")]);
        let mut screen = DescribeScreen::new(
            context(&client, EventWriter::disabled("s-1")),
            Box::new(FakeCamera::new(false)),
        );
        assert_eq!(screen.request_permission(), CameraPermission::Denied);
        assert_eq!(
            screen.view(),
            DescribeView::PermissionPrompt {
                message: PERMISSION_MESSAGE
            }
        );
        let err = screen.take_photo().unwrap_err();
        assert_eq!(
            err.downcast_ref::<ScreenError>(),
            Some(&ScreenError::PermissionDenied)
        );

        screen.set_camera(Box::new(FakeCamera::new(true)))?;
        assert!(matches!(screen.take_photo()?, DescribeOutcome::Described(_)));
        Ok(())
    }

    #[test]
    fn unknown_permission_blocks_capture() {
        let client = ScriptedClient::new(Vec::new());
        let mut screen = DescribeScreen::new(
            context(&client, EventWriter::disabled("s-1")),
            Box::new(FakeCamera::new(true)),
        );
        let err = screen.take_photo().unwrap_err();
        assert_eq!(
            err.downcast_ref::<ScreenError>(),
            Some(&ScreenError::PermissionUnknown)
        );
    }

    #[test]
    fn failures_clear_loading_and_are_not_alerts() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let events = EventWriter::new(temp.path().join("events.jsonl"), "s-1");
        let client = ScriptedClient::new(vec![Err("Gemini request failed (500)")]);
        let mut broken = FakeCamera::new(true);
        broken.broken = true;
        let mut screen = DescribeScreen::new(context(&client, events.clone()), Box::new(broken));
        screen.request_permission();

        let outcome = screen.take_photo()?;
        assert_eq!(
            outcome,
            DescribeOutcome::Failed {
                error: "lens cap is on".to_string()
            }
        );
        assert!(!screen.state().is_loading());

        screen.set_camera(Box::new(FakeCamera::new(true)))?;
        let outcome = screen.take_photo()?;
        assert!(matches!(outcome, DescribeOutcome::Failed { .. }));
        assert!(!screen.state().is_loading());
        assert_eq!(
            event_types(&events),
            vec![
                "permission_changed",
                "description_failed",
                "photo_captured",
                "description_failed"
            ]
        );
        Ok(())
    }

    #[test]
    fn broken_event_log_keeps_description() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let client = ScriptedClient::new(vec![Ok("A ball of yarn.")]);
        let mut screen = DescribeScreen::new(
            context(&client, unwritable_events(temp.path())),
            Box::new(FakeCamera::new(true)),
        );
        assert_eq!(screen.request_permission(), CameraPermission::Granted);
        assert_eq!(
            screen.take_photo()?,
            DescribeOutcome::Described(Alert::titled("What is this?", "A ball of yarn."))
        );
        assert!(!screen.state().is_loading());
        Ok(())
    }
}

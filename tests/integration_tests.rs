use mockito::{Matcher, Server};
use sora_video::{ConfigBuilder, SubmissionMode, VideoError, Workflow};
use std::path::PathBuf;
use tempfile::TempDir;

const JOB_ID: &str = "video_68e4f1a2b3c4d5e6";

fn workflow_for(server: &Server, output_dir: PathBuf, image: Option<PathBuf>) -> Workflow {
    let config = ConfigBuilder::new()
        .with_base_url(server.url())
        .with_api_key("sk-integration")
        .with_prompt("test")
        .with_image_path(image)
        .with_poll_interval(1)
        .with_max_wait(30)
        .with_output_dir(output_dir)
        .build();
    config.validate().unwrap();
    Workflow::new(config).unwrap()
}

async fn mock_submit(server: &mut Server) -> mockito::Mock {
    server
        .mock("POST", "/videos")
        .match_header("authorization", "sk-integration")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(format!(
            r#"{{"id":"{}","status":"submitted","created_at":1760000000}}"#,
            JOB_ID
        ))
        .create_async()
        .await
}

async fn mock_completed(server: &mut Server) -> mockito::Mock {
    server
        .mock("GET", format!("/videos/{}", JOB_ID).as_str())
        .match_header("authorization", "sk-integration")
        .with_status(200)
        .with_body(format!(
            r#"{{"id":"{id}","status":"completed","progress":100,"created_at":1760000000,
                "completed_at":1760000240,"url":"https://cdn.example.com/{id}.mp4"}}"#,
            id = JOB_ID
        ))
        .create_async()
        .await
}

#[tokio::test]
async fn test_full_text_to_video_workflow() {
    let mut server = Server::new_async().await;
    let temp_dir = TempDir::new().unwrap();
    let video: Vec<u8> = (0..50_000u32).map(|i| (i % 256) as u8).collect();

    let submit = mock_submit(&mut server).await;
    let status = mock_completed(&mut server).await;
    let content = server
        .mock("GET", format!("/videos/{}/content", JOB_ID).as_str())
        .match_header("authorization", "sk-integration")
        .with_status(200)
        .with_header("content-type", "video/mp4")
        .with_body(video.clone())
        .create_async()
        .await;

    let workflow = workflow_for(&server, temp_dir.path().to_path_buf(), None);
    let outcome = workflow.run().await.unwrap();

    submit.assert_async().await;
    status.assert_async().await;
    content.assert_async().await;

    assert_eq!(outcome.mode, SubmissionMode::Text);
    assert_eq!(outcome.job.id().as_str(), JOB_ID);
    assert_eq!(outcome.job.url(), format!("https://cdn.example.com/{}.mp4", JOB_ID));
    assert_eq!(
        outcome.file.path,
        temp_dir.path().join("sora_text_video_b3c4d5e6.mp4")
    );
    assert_eq!(outcome.file.bytes_written, video.len() as u64);
    assert_eq!(tokio::fs::read(&outcome.file.path).await.unwrap(), video);
}

#[tokio::test]
async fn test_image_to_video_workflow() {
    let mut server = Server::new_async().await;
    let temp_dir = TempDir::new().unwrap();
    let image = temp_dir.path().join("dog-and-cat.png");
    tokio::fs::write(&image, b"fake png bytes").await.unwrap();

    let submit = server
        .mock("POST", "/videos")
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(r#"name="input_reference"; filename="dog-and-cat.png""#.into()),
            Matcher::Regex("image/png".into()),
        ]))
        .with_status(200)
        .with_body(format!(r#"{{"id":"{}","status":"submitted"}}"#, JOB_ID))
        .create_async()
        .await;
    let _status = mock_completed(&mut server).await;
    let _mock = server
        .mock("GET", format!("/videos/{}/content", JOB_ID).as_str())
        .with_status(200)
        .with_body("mp4")
        .create_async()
        .await;

    let workflow = workflow_for(&server, temp_dir.path().to_path_buf(), Some(image));
    let outcome = workflow.run().await.unwrap();

    submit.assert_async().await;
    assert_eq!(outcome.mode, SubmissionMode::Image);
    assert_eq!(
        outcome.file.path,
        temp_dir.path().join("sora_image_video_b3c4d5e6.mp4")
    );
}

#[tokio::test]
async fn test_output_override_path() {
    let mut server = Server::new_async().await;
    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("custom.mp4");

    let _submit = mock_submit(&mut server).await;
    let _status = mock_completed(&mut server).await;
    let _mock = server
        .mock("GET", format!("/videos/{}/content", JOB_ID).as_str())
        .with_status(200)
        .with_body("x")
        .create_async()
        .await;

    let workflow = workflow_for(&server, temp_dir.path().to_path_buf(), None)
        .with_output_path(Some(target.clone()));
    let outcome = workflow.run().await.unwrap();

    assert_eq!(outcome.file.path, target);
    assert_eq!(outcome.file.bytes_written, 1);
}

#[tokio::test]
async fn test_submission_failure_stops_workflow() {
    let mut server = Server::new_async().await;
    let temp_dir = TempDir::new().unwrap();

    let _mock = server
        .mock("POST", "/videos")
        .with_status(400)
        .with_body(r#"{"error":{"message":"seconds must be 10 or 15"}}"#)
        .create_async()
        .await;
    let status = server
        .mock("GET", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let workflow = workflow_for(&server, temp_dir.path().to_path_buf(), None);
    let err = workflow.run().await.unwrap_err();

    assert!(matches!(err, VideoError::Submission { status: Some(400), .. }));
    status.assert_async().await;
}

#[tokio::test]
async fn test_generation_failure_skips_download() {
    let mut server = Server::new_async().await;
    let temp_dir = TempDir::new().unwrap();

    let _submit = mock_submit(&mut server).await;
    let status = server
        .mock("GET", format!("/videos/{}", JOB_ID).as_str())
        .with_status(200)
        .with_body(format!(
            r#"{{"id":"{}","status":"failed","error":{{"message":"content policy"}}}}"#,
            JOB_ID
        ))
        .expect(1)
        .create_async()
        .await;
    let content = server
        .mock("GET", format!("/videos/{}/content", JOB_ID).as_str())
        .expect(0)
        .create_async()
        .await;

    let workflow = workflow_for(&server, temp_dir.path().to_path_buf(), None);
    let err = workflow.run().await.unwrap_err();

    match err {
        VideoError::GenerationFailed { job_id, reason } => {
            assert_eq!(job_id, JOB_ID);
            assert_eq!(reason.as_deref(), Some("content policy"));
        }
        other => panic!("expected generation failure, got {:?}", other),
    }
    status.assert_async().await;
    content.assert_async().await;
}

#[tokio::test]
async fn test_download_http_error() {
    let mut server = Server::new_async().await;
    let temp_dir = TempDir::new().unwrap();

    let _submit = mock_submit(&mut server).await;
    let _status = mock_completed(&mut server).await;
    let _mock = server
        .mock("GET", format!("/videos/{}/content", JOB_ID).as_str())
        .with_status(404)
        .with_body("not found")
        .create_async()
        .await;

    let workflow = workflow_for(&server, temp_dir.path().to_path_buf(), None);
    let err = workflow.run().await.unwrap_err();

    match err {
        VideoError::Download { status, message } => {
            assert_eq!(status, Some(404));
            assert_eq!(message, "not found");
        }
        other => panic!("expected download error, got {:?}", other),
    }
    assert!(!temp_dir.path().join("sora_text_video_b3c4d5e6.mp4").exists());
}

#[tokio::test]
async fn test_status_for_another_job_skips_download() {
    let mut server = Server::new_async().await;
    let temp_dir = TempDir::new().unwrap();
    let other_id = "video_BBBBBBBB22222222";

    let _submit = mock_submit(&mut server).await;
    let _status = server
        .mock("GET", format!("/videos/{}", JOB_ID).as_str())
        .with_status(200)
        .with_body(format!(
            r#"{{"id":"{id}","status":"completed","completed_at":1760000240,
                "url":"https://cdn.example.com/{id}.mp4"}}"#,
            id = other_id
        ))
        .create_async()
        .await;
    let content = server
        .mock("GET", Matcher::Regex(r"^/videos/.+/content$".into()))
        .expect(0)
        .create_async()
        .await;

    let workflow = workflow_for(&server, temp_dir.path().to_path_buf(), None);
    let err = workflow.run().await.unwrap_err();

    assert!(matches!(err, VideoError::InvalidResponse(_)));
    content.assert_async().await;
    assert!(!temp_dir.path().join("sora_text_video_22222222.mp4").exists());
}

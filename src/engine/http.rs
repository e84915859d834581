//! Model-backed classifier reached over HTTP.
//!
//! `POST {base}/classify` with the raw image bytes; the JSON reply is checked against the
//! result contract before it is turned into a [`ClassificationResult`].

use super::{CancelFlag, ClassificationError, Classifier};
use crate::model::{
    ClassificationResult, ImageSubmission, LivestockTraits, Mood, Narrative, Percent,
    SubjectProfile, WorkflowConfig,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TraitsBody {
    body_size: i64,
    posture: i64,
    symmetry: i64,
}

/// Wire shape of a backend reply. Livestock fields are optional extensions.
///
/// Everything except the identity fields is optional on the wire so that an incomplete
/// reply surfaces as [`ClassificationError::InvalidResponse`] rather than a decode error.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClassifyResponse {
    subject_type: String,
    #[serde(default)]
    mood: Option<String>,
    confidence: i64,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    habitat: Option<String>,
    #[serde(default)]
    safety_tips: Option<Vec<String>>,
    #[serde(default)]
    fun_fact: Option<String>,
    #[serde(default)]
    body_structure_score: Option<i64>,
    #[serde(default)]
    traits: Option<TraitsBody>,
    #[serde(default)]
    recommendations: Option<Vec<String>>,
}

fn required<T>(field: &str, value: Option<T>) -> Result<T, ClassificationError> {
    value.ok_or_else(|| ClassificationError::InvalidResponse(format!("missing {field}")))
}

fn percent(field: &str, v: i64) -> Result<Percent, ClassificationError> {
    u8::try_from(v)
        .ok()
        .and_then(Percent::new)
        .ok_or_else(|| ClassificationError::InvalidResponse(format!("{field} {v} outside 0..=100")))
}

fn parse_mood(raw: &str) -> Result<Mood, ClassificationError> {
    match raw {
        "Calm" => Ok(Mood::Calm),
        "Aggressive" => Ok(Mood::Aggressive),
        other => Err(ClassificationError::InvalidResponse(format!(
            "unknown mood {other:?}"
        ))),
    }
}

impl TryFrom<ClassifyResponse> for ClassificationResult {
    type Error = ClassificationError;

    fn try_from(r: ClassifyResponse) -> Result<Self, Self::Error> {
        if r.subject_type.trim().is_empty() {
            return Err(ClassificationError::InvalidResponse(
                "empty subjectType".into(),
            ));
        }
        let confidence = percent("confidence", r.confidence)?;

        let description = required("description", r.description)?;

        let (profile, narrative) = match (r.body_structure_score, r.traits) {
            (Some(score), Some(traits)) => {
                let profile = SubjectProfile::Livestock {
                    body_structure_score: percent("bodyStructureScore", score)?,
                    traits: LivestockTraits {
                        body_size: percent("traits.bodySize", traits.body_size)?,
                        posture: percent("traits.posture", traits.posture)?,
                        symmetry: percent("traits.symmetry", traits.symmetry)?,
                    },
                };
                let guidance = match (r.recommendations, r.safety_tips) {
                    (Some(recs), _) if !recs.is_empty() => recs,
                    (_, Some(tips)) if !tips.is_empty() => tips,
                    _ => return Err(ClassificationError::InvalidResponse(
                        "missing recommendations".into(),
                    )),
                };
                let narrative = Narrative {
                    description,
                    context: r.habitat.unwrap_or_default(),
                    guidance,
                    highlight_fact: r.fun_fact.unwrap_or_default(),
                };
                (profile, narrative)
            }
            _ => {
                let mood = r.mood.as_deref().map(parse_mood).transpose()?;
                let narrative = Narrative {
                    description,
                    context: required("habitat", r.habitat)?,
                    guidance: required("safetyTips", r.safety_tips)?,
                    highlight_fact: required("funFact", r.fun_fact)?,
                };
                (SubjectProfile::Wildlife { mood }, narrative)
            }
        };

        Ok(ClassificationResult {
            subject_type: r.subject_type,
            confidence,
            narrative,
            profile,
        })
    }
}

pub struct HttpClassifier {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpClassifier {
    pub fn new(base_url: &str, cfg: &WorkflowConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .timeout(cfg.classify_timeout)
            .build()
            .context("build HTTP client")?;
        Ok(Self {
            client,
            endpoint: format!("{}/classify", base_url.trim_end_matches('/')),
            timeout: cfg.classify_timeout,
        })
    }

    async fn request(
        &self,
        submission: &ImageSubmission,
    ) -> Result<ClassificationResult, ClassificationError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, submission.mime_type.as_str())
            .body(submission.bytes.clone())
            .send()
            .await
            .map_err(|e| self.map_reqwest(e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ClassificationError::Status(status.as_u16()));
        }

        let body = resp.bytes().await.map_err(|e| self.map_reqwest(e))?;
        let parsed: ClassifyResponse = serde_json::from_slice(&body)
            .map_err(|e| ClassificationError::Decode(e.to_string()))?;
        ClassificationResult::try_from(parsed)
    }

    fn map_reqwest(&self, e: reqwest::Error) -> ClassificationError {
        if e.is_timeout() {
            ClassificationError::Timeout(self.timeout)
        } else {
            ClassificationError::Transport(e.to_string())
        }
    }
}

#[async_trait]
impl Classifier for HttpClassifier {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn classify(
        &self,
        submission: Arc<ImageSubmission>,
        cancel: CancelFlag,
    ) -> Result<ClassificationResult, ClassificationError> {
        log::info!(
            "POST {} ({} bytes, {})",
            self.endpoint,
            submission.size_bytes,
            submission.mime_type
        );
        let res = tokio::select! {
            res = self.request(&submission) => res,
            _ = cancel.cancelled() => Err(ClassificationError::Cancelled),
        };
        if let Err(e) = &res {
            log::warn!("classification via {} failed: {e}", self.endpoint);
        }
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serve exactly one HTTP response and hand back the raw request.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<Vec<u8>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut req = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = sock.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                req.extend_from_slice(&buf[..n]);
                if let Some(end) = find(&req, b"\r\n\r\n") {
                    let head = String::from_utf8_lossy(&req[..end]).to_ascii_lowercase();
                    let len = head
                        .lines()
                        .find_map(|l| l.strip_prefix("content-length:"))
                        .and_then(|v| v.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    if req.len() >= end + 4 + len {
                        break;
                    }
                }
            }
            let resp = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            sock.write_all(resp.as_bytes()).await.unwrap();
            sock.shutdown().await.ok();
            req
        });
        (format!("http://{addr}"), handle)
    }

    fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
        haystack.windows(needle.len()).position(|w| w == needle)
    }

    fn submission() -> Arc<ImageSubmission> {
        Arc::new(ImageSubmission {
            name: "tiger.jpg".into(),
            mime_type: "image/jpeg".into(),
            size_bytes: 4,
            bytes: Bytes::from_static(b"\xff\xd8\xff\xe0"),
        })
    }

    fn classifier(url: &str) -> HttpClassifier {
        HttpClassifier::new(url, &WorkflowConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn decodes_wildlife_reply_and_posts_raw_bytes() {
        let (url, server) = serve_once(
            "200 OK",
            r#"{"subjectType":"Bengal Tiger","mood":"Aggressive","confidence":93,"description":"d","habitat":"h","safetyTips":["a","b"],"funFact":"f"}"#,
        )
        .await;
        let res = classifier(&url)
            .classify(submission(), CancelFlag::new())
            .await
            .unwrap();
        assert_eq!(res.subject_type, "Bengal Tiger");
        assert_eq!(res.confidence.get(), 93);
        assert_eq!(res.mood(), Some(Mood::Aggressive));
        assert_eq!(res.narrative.guidance, vec!["a", "b"]);

        let req = server.await.unwrap();
        let text = String::from_utf8_lossy(&req).to_ascii_lowercase();
        assert!(text.starts_with("post /classify "));
        assert!(text.contains("content-type: image/jpeg"));
        assert!(req.ends_with(b"\xff\xd8\xff\xe0"));
    }

    #[tokio::test]
    async fn decodes_livestock_reply() {
        let (url, _server) = serve_once(
            "200 OK",
            r#"{"subjectType":"Buffalo","confidence":88,"description":"d","bodyStructureScore":91,"traits":{"bodySize":84,"posture":80,"symmetry":90},"recommendations":["x","y"]}"#,
        )
        .await;
        let res = classifier(&url)
            .classify(submission(), CancelFlag::new())
            .await
            .unwrap();
        assert!(res.mood().is_none());
        assert!(matches!(res.profile, SubjectProfile::Livestock { .. }));
        assert_eq!(res.narrative.guidance, vec!["x", "y"]);
    }

    #[tokio::test]
    async fn non_2xx_maps_to_status_error() {
        let (url, _server) = serve_once("503 Service Unavailable", "{}").await;
        let err = classifier(&url)
            .classify(submission(), CancelFlag::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ClassificationError::Status(503)));
    }

    #[tokio::test]
    async fn out_of_range_confidence_is_rejected() {
        let (url, _server) = serve_once(
            "200 OK",
            r#"{"subjectType":"Tiger","confidence":140,"description":"d","habitat":"h","safetyTips":["a"],"funFact":"f"}"#,
        )
        .await;
        let err = classifier(&url)
            .classify(submission(), CancelFlag::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ClassificationError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn unknown_mood_is_rejected() {
        let (url, _server) = serve_once(
            "200 OK",
            r#"{"subjectType":"Tiger","confidence":90,"mood":"Sleepy","description":"d","habitat":"h","safetyTips":["a"],"funFact":"f"}"#,
        )
        .await;
        let err = classifier(&url)
            .classify(submission(), CancelFlag::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ClassificationError::InvalidResponse(_)));
    }

    fn decode(body: &str) -> Result<ClassificationResult, ClassificationError> {
        let parsed: ClassifyResponse = serde_json::from_str(body).unwrap();
        ClassificationResult::try_from(parsed)
    }

    #[test]
    fn incomplete_wildlife_reply_is_rejected() {
        let err = decode(r#"{"subjectType":"Tiger","confidence":90}"#).unwrap_err();
        assert!(matches!(err, ClassificationError::InvalidResponse(_)));

        let err = decode(
            r#"{"subjectType":"Tiger","confidence":90,"description":"d","habitat":"h","safetyTips":["a"]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ClassificationError::InvalidResponse(m) if m.contains("funFact")));
    }

    #[test]
    fn livestock_reply_needs_guidance() {
        let err = decode(
            r#"{"subjectType":"Cattle","confidence":88,"description":"d","bodyStructureScore":91,"traits":{"bodySize":84,"posture":80,"symmetry":90}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ClassificationError::InvalidResponse(m) if m.contains("recommendations")));

        let ok = decode(
            r#"{"subjectType":"Cattle","confidence":88,"description":"d","bodyStructureScore":91,"traits":{"bodySize":84,"posture":80,"symmetry":90},"safetyTips":["s"]}"#,
        )
        .unwrap();
        assert_eq!(ok.narrative.guidance, vec!["s"]);
    }

    #[test]
    fn mood_may_be_omitted() {
        let res = decode(
            r#"{"subjectType":"Red Fox","confidence":77,"description":"d","habitat":"h","safetyTips":[],"funFact":"f"}"#,
        )
        .unwrap();
        assert_eq!(res.profile, SubjectProfile::Wildlife { mood: None });
    }

    #[tokio::test]
    async fn garbage_body_is_a_decode_error() {
        let (url, _server) = serve_once("200 OK", "not json").await;
        let err = classifier(&url)
            .classify(submission(), CancelFlag::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ClassificationError::Decode(_)));
    }

    #[tokio::test]
    async fn refused_connection_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let err = classifier(&format!("http://{addr}"))
            .classify(submission(), CancelFlag::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ClassificationError::Transport(_)));
    }
}

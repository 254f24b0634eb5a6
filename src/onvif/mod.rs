//! Minimal ONVIF client.
//!
//! Only the handful of calls needed to identify a camera and list what it
//! offers: device information, capabilities, media profiles with their
//! RTSP URIs, and PTZ status/limits. Every request carries a WS-Security
//! UsernameToken digest.

pub mod soap;
pub mod types;

pub use types::{
    AxisRange, CameraDetails, DeviceIdentity, InspectionStatus, PtzInfo, PtzLimits, PtzStatus,
    StreamProfile,
};

use crate::auth::DeviceInspector;
use crate::discovery::range::DEVICE_SERVICE_PATH;
use crate::error::{AuthError, AuthResult};
use crate::types::Credentials;
use crate::xml::{self, Element};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use std::net::Ipv4Addr;
use std::time::Duration;
use tracing::debug;
use types::{parse_profiles, parse_stream_uri, Capabilities, MediaProfile};

const SOAP_CONTENT_TYPE: &str = "application/soap+xml; charset=utf-8";

/// Opens authenticated sessions against ONVIF device services.
#[derive(Debug, Clone)]
pub struct OnvifClient {
    http: reqwest::Client,
    port: u16,
    timeout: Duration,
}

impl OnvifClient {
    /// Client for device services on `port`, each request bounded by `timeout`.
    pub fn new(port: u16, timeout: Duration) -> AuthResult<Self> {
        let http = reqwest::Client::builder()
            .no_proxy()
            .build()
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            port,
            timeout,
        })
    }

    /// Device service URL of `address`.
    pub fn endpoint(&self, address: Ipv4Addr) -> String {
        format!("http://{}:{}{}", address, self.port, DEVICE_SERVICE_PATH)
    }
}

#[async_trait]
impl DeviceInspector for OnvifClient {
    type Session = DeviceSession;

    async fn open_session(
        &self,
        address: Ipv4Addr,
        credentials: &Credentials,
    ) -> AuthResult<DeviceSession> {
        let mut session = DeviceSession {
            address,
            credentials: credentials.clone(),
            device_url: self.endpoint(address),
            identity: DeviceIdentity::default(),
            http: self.http.clone(),
            timeout: self.timeout,
        };

        let body = format!(r#"<tds:GetDeviceInformation xmlns:tds="{}"/>"#, soap::DEVICE_NS);
        let response = session.call(&session.device_url, &body).await?;
        session.identity = DeviceIdentity::from_xml(&response);

        Ok(session)
    }
}

/// An authenticated connection to one device.
#[derive(Debug, Clone)]
pub struct DeviceSession {
    address: Ipv4Addr,
    credentials: Credentials,
    device_url: String,
    identity: DeviceIdentity,
    http: reqwest::Client,
    timeout: Duration,
}

impl DeviceSession {
    pub fn address(&self) -> Ipv4Addr {
        self.address
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Identity read when the session was opened.
    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    /// Query profiles, stream URIs and PTZ support.
    ///
    /// Individual query failures degrade the result instead of failing it.
    pub async fn inspect(&self) -> CameraDetails {
        let caps = match self.capabilities().await {
            Ok(caps) => caps,
            Err(e) => {
                debug!(address = %self.address, error = %e, "GetCapabilities failed");
                Capabilities::default()
            }
        };
        let media_url = caps.media.as_deref().unwrap_or(&self.device_url);

        let (media_profiles, profiles_ok) = match self.media_profiles(media_url).await {
            Ok(profiles) => (profiles, true),
            Err(e) => {
                debug!(address = %self.address, error = %e, "GetProfiles failed");
                (Vec::new(), false)
            }
        };

        let mut profiles = Vec::with_capacity(media_profiles.len());
        for profile in &media_profiles {
            let rtsp_uri = match self.stream_uri(media_url, &profile.token).await {
                Ok(uri) => uri,
                Err(e) => {
                    debug!(
                        address = %self.address,
                        profile = %profile.name,
                        error = %e,
                        "GetStreamUri failed"
                    );
                    None
                }
            };
            profiles.push(StreamProfile {
                name: profile.name.clone(),
                token: profile.token.clone(),
                rtsp_uri,
            });
        }

        let ptz = match caps.ptz.as_deref() {
            Some(ptz_url) => self.ptz(ptz_url, media_profiles.first()).await,
            None => PtzInfo::unsupported(),
        };

        let status = if self.identity.is_complete() && profiles_ok {
            InspectionStatus::Ok
        } else {
            InspectionStatus::IncompleteData
        };

        CameraDetails {
            identity: self.identity.clone(),
            profiles,
            ptz,
            status,
        }
    }

    async fn capabilities(&self) -> AuthResult<Capabilities> {
        let body = format!(
            r#"<tds:GetCapabilities xmlns:tds="{}"><tds:Category>All</tds:Category></tds:GetCapabilities>"#,
            soap::DEVICE_NS
        );
        let response = self.call(&self.device_url, &body).await?;
        Ok(Capabilities::from_xml(&response))
    }

    async fn media_profiles(&self, media_url: &str) -> AuthResult<Vec<MediaProfile>> {
        let body = format!(r#"<trt:GetProfiles xmlns:trt="{}"/>"#, soap::MEDIA_NS);
        let response = self.call(media_url, &body).await?;
        Ok(parse_profiles(&response))
    }

    async fn stream_uri(&self, media_url: &str, token: &str) -> AuthResult<Option<String>> {
        let body = format!(
            concat!(
                r#"<trt:GetStreamUri xmlns:trt="{media}" xmlns:tt="{schema}">"#,
                "<trt:StreamSetup><tt:Stream>RTP-Unicast</tt:Stream>",
                "<tt:Transport><tt:Protocol>RTSP</tt:Protocol></tt:Transport></trt:StreamSetup>",
                "<trt:ProfileToken>{token}</trt:ProfileToken>",
                "</trt:GetStreamUri>",
            ),
            media = soap::MEDIA_NS,
            schema = soap::SCHEMA_NS,
            token = soap::text(token),
        );
        let response = self.call(media_url, &body).await?;
        Ok(parse_stream_uri(&response))
    }

    /// PTZ status and limits, read through the first profile.
    async fn ptz(&self, ptz_url: &str, profile: Option<&MediaProfile>) -> PtzInfo {
        let mut info = PtzInfo {
            supported: true,
            ..PtzInfo::default()
        };
        let Some(profile) = profile else {
            return info;
        };

        let body = format!(
            r#"<tptz:GetStatus xmlns:tptz="{}"><tptz:ProfileToken>{}</tptz:ProfileToken></tptz:GetStatus>"#,
            soap::PTZ_NS,
            soap::text(&profile.token)
        );
        match self.call(ptz_url, &body).await {
            Ok(response) => info.status = PtzStatus::from_xml(&response),
            Err(e) => debug!(address = %self.address, error = %e, "PTZ GetStatus failed"),
        }

        if let Some(config) = &profile.ptz_configuration {
            let body = format!(
                r#"<tptz:GetConfigurationOptions xmlns:tptz="{}"><tptz:ConfigurationToken>{}</tptz:ConfigurationToken></tptz:GetConfigurationOptions>"#,
                soap::PTZ_NS,
                soap::text(config)
            );
            match self.call(ptz_url, &body).await {
                Ok(response) => info.limits = Some(PtzLimits::from_xml(&response)),
                Err(e) => debug!(
                    address = %self.address,
                    error = %e,
                    "PTZ GetConfigurationOptions failed"
                ),
            }
        }

        info
    }

    /// Post one authenticated request and return the parsed response.
    async fn call(&self, url: &str, body: &str) -> AuthResult<Element> {
        let envelope = soap::envelope(&soap::security_header(&self.credentials), body);

        let response = self
            .http
            .post(url)
            .header(CONTENT_TYPE, SOAP_CONTENT_TYPE)
            .timeout(self.timeout)
            .body(envelope)
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(AuthError::Rejected(format!("HTTP {}", status)));
        }

        let text = response
            .text()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;
        let doc = xml::parse(&text).map_err(|e| {
            AuthError::Protocol(format!("HTTP {}: unparseable response: {}", status, e))
        })?;

        if let Some(fault) = soap::fault(&doc) {
            return Err(fault);
        }
        if !status.is_success() {
            return Err(AuthError::Protocol(format!("HTTP {}", status)));
        }
        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::CredentialResolver;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    /// Read one HTTP request, returning its body.
    async fn read_request(stream: &mut TcpStream) -> String {
        let mut data = Vec::new();
        let mut buf = [0u8; 4096];

        loop {
            let n = stream.read(&mut buf).await.unwrap_or(0);
            if n == 0 {
                break;
            }
            data.extend_from_slice(&buf[..n]);

            let text = String::from_utf8_lossy(&data);
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if data.len() >= end + 4 + length {
                    return String::from_utf8_lossy(&data[end + 4..end + 4 + length]).into_owned();
                }
            }
        }
        String::new()
    }

    fn respond(status: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {}\r\nContent-Type: application/soap+xml\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        )
    }

    fn soap_body(inner: &str) -> String {
        format!(
            r#"<?xml version="1.0"?><s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope"><s:Body>{}</s:Body></s:Envelope>"#,
            inner
        )
    }

    /// Fake PTZ camera accepting only `admin`; answers by SOAP action.
    async fn spawn_camera(with_ptz: bool) -> (u16, tokio::task::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let handle = tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let body = read_request(&mut stream).await;
                    let reply = if !body.contains("<wsse:Username>admin</wsse:Username>") {
                        respond("401 Unauthorized", "")
                    } else if body.contains("GetDeviceInformation") {
                        respond("200 OK", &soap_body(
                            "<tds:GetDeviceInformationResponse><tds:Manufacturer>Acme</tds:Manufacturer>\
                             <tds:Model>PTZ-1</tds:Model><tds:FirmwareVersion>1.0</tds:FirmwareVersion>\
                             </tds:GetDeviceInformationResponse>",
                        ))
                    } else if body.contains("GetCapabilities") {
                        let ptz = if with_ptz {
                            format!("<tt:PTZ><tt:XAddr>http://127.0.0.1:{port}/onvif/ptz</tt:XAddr></tt:PTZ>")
                        } else {
                            String::new()
                        };
                        respond("200 OK", &soap_body(&format!(
                            "<tds:GetCapabilitiesResponse><tds:Capabilities>\
                             <tt:Media><tt:XAddr>http://127.0.0.1:{port}/onvif/media</tt:XAddr></tt:Media>\
                             {ptz}</tds:Capabilities></tds:GetCapabilitiesResponse>"
                        )))
                    } else if body.contains("GetProfiles") {
                        respond("200 OK", &soap_body(
                            r#"<trt:GetProfilesResponse>
                               <trt:Profiles token="main"><tt:Name>Main</tt:Name>
                               <tt:PTZConfiguration token="ptz0"/></trt:Profiles>
                               <trt:Profiles token="sub"><tt:Name>Sub</tt:Name></trt:Profiles>
                               </trt:GetProfilesResponse>"#,
                        ))
                    } else if body.contains("GetStreamUri") {
                        if body.contains("<trt:ProfileToken>main</trt:ProfileToken>") {
                            respond("200 OK", &soap_body(
                                "<trt:GetStreamUriResponse><trt:MediaUri>\
                                 <tt:Uri>rtsp://127.0.0.1/main</tt:Uri></trt:MediaUri></trt:GetStreamUriResponse>",
                            ))
                        } else {
                            respond("500 Internal Server Error", &soap_body(
                                "<s:Fault><s:Code><s:Value>s:Receiver</s:Value></s:Code>\
                                 <s:Reason><s:Text>no stream</s:Text></s:Reason></s:Fault>",
                            ))
                        }
                    } else if body.contains("GetStatus") {
                        respond("200 OK", &soap_body(
                            r#"<tptz:GetStatusResponse><tptz:PTZStatus><tt:Position>
                               <tt:PanTilt x="0.1" y="0.2"/><tt:Zoom x="0.3"/>
                               </tt:Position></tptz:PTZStatus></tptz:GetStatusResponse>"#,
                        ))
                    } else if body.contains("GetConfigurationOptions") {
                        respond("200 OK", &soap_body(
                            "<tptz:GetConfigurationOptionsResponse><tptz:PTZConfigurationOptions><tt:Spaces>\
                             <tt:AbsoluteZoomPositionSpace><tt:XRange><tt:Min>0</tt:Min><tt:Max>4</tt:Max></tt:XRange>\
                             </tt:AbsoluteZoomPositionSpace></tt:Spaces></tptz:PTZConfigurationOptions>\
                             </tptz:GetConfigurationOptionsResponse>",
                        ))
                    } else {
                        respond("400 Bad Request", "")
                    };
                    let _ = stream.write_all(reply.as_bytes()).await;
                    let _ = stream.shutdown().await;
                });
            }
        });

        (port, handle)
    }

    fn client(port: u16) -> OnvifClient {
        OnvifClient::new(port, Duration::from_secs(2)).unwrap()
    }

    #[tokio::test]
    async fn test_wrong_credentials_are_rejected() {
        let (port, camera) = spawn_camera(false).await;

        let result = client(port)
            .open_session(Ipv4Addr::LOCALHOST, &Credentials::new("root", "root"))
            .await;
        camera.abort();

        assert!(matches!(result, Err(AuthError::Rejected(_))));
    }

    #[tokio::test]
    async fn test_unreachable_device_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let result = client(port)
            .open_session(Ipv4Addr::LOCALHOST, &Credentials::new("admin", ""))
            .await;
        assert!(matches!(result, Err(AuthError::Transport(_))));
    }

    #[tokio::test]
    async fn test_session_and_inspection() {
        let (port, camera) = spawn_camera(true).await;

        let session = client(port)
            .open_session(Ipv4Addr::LOCALHOST, &Credentials::new("admin", "anything"))
            .await
            .unwrap();
        assert_eq!(session.identity().manufacturer.as_deref(), Some("Acme"));
        assert_eq!(session.credentials().username, "admin");

        let details = session.inspect().await;
        camera.abort();

        assert_eq!(details.status, InspectionStatus::Ok);
        assert_eq!(details.profiles.len(), 2);
        assert_eq!(details.profiles[0].rtsp_uri.as_deref(), Some("rtsp://127.0.0.1/main"));
        assert_eq!(details.profiles[1].rtsp_uri, None);

        assert!(details.ptz.supported);
        assert_eq!(
            details.ptz.status,
            Some(PtzStatus { pan: 0.1, tilt: 0.2, zoom: 0.3 })
        );
        let limits = details.ptz.limits.unwrap();
        assert_eq!(limits.zoom, AxisRange::new(0.0, 4.0));
        assert_eq!(limits.pan, AxisRange::new(-1.0, 1.0));
    }

    #[tokio::test]
    async fn test_camera_without_ptz() {
        let (port, camera) = spawn_camera(false).await;

        let session = client(port)
            .open_session(Ipv4Addr::LOCALHOST, &Credentials::new("admin", ""))
            .await
            .unwrap();
        let details = session.inspect().await;
        camera.abort();

        assert!(!details.ptz.supported);
        assert_eq!(details.ptz.status, None);
    }

    #[tokio::test]
    async fn test_resolver_against_device() {
        let (port, camera) = spawn_camera(false).await;

        let resolution = CredentialResolver::new(None)
            .resolve(Ipv4Addr::LOCALHOST, &client(port), None)
            .await;
        camera.abort();

        assert_eq!(
            resolution.outcome.credentials(),
            Some(&Credentials::new("admin", "admin"))
        );
        assert!(resolution.session.is_some());
    }
}

//! Camera details reported by the ONVIF services, and how to read them
//! out of the SOAP responses.

use crate::xml::Element;
use serde::{Deserialize, Serialize};
use std::fmt;

/// `GetDeviceInformation` response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub firmware_version: Option<String>,
    pub serial_number: Option<String>,
    pub hardware_id: Option<String>,
}

impl DeviceIdentity {
    pub(crate) fn from_xml(doc: &Element) -> Self {
        Self {
            manufacturer: doc.find_text("Manufacturer"),
            model: doc.find_text("Model"),
            firmware_version: doc.find_text("FirmwareVersion"),
            serial_number: doc.find_text("SerialNumber"),
            hardware_id: doc.find_text("HardwareId"),
        }
    }

    /// Manufacturer and model are both known.
    pub fn is_complete(&self) -> bool {
        self.manufacturer.is_some() && self.model.is_some()
    }
}

/// One media profile and its RTSP stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamProfile {
    pub name: String,
    pub token: String,
    /// `None` when the stream URI query failed.
    pub rtsp_uri: Option<String>,
}

/// Profile entry of a `GetProfiles` response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MediaProfile {
    pub name: String,
    pub token: String,
    pub ptz_configuration: Option<String>,
}

pub(crate) fn parse_profiles(doc: &Element) -> Vec<MediaProfile> {
    doc.find_all("Profiles")
        .filter_map(|profile| {
            let token = profile.attr("token")?.to_string();
            let name = profile
                .child("Name")
                .map(|n| n.text().to_string())
                .unwrap_or_else(|| token.clone());
            let ptz_configuration = profile
                .child("PTZConfiguration")
                .and_then(|c| c.attr("token"))
                .map(str::to_owned);

            Some(MediaProfile {
                name,
                token,
                ptz_configuration,
            })
        })
        .collect()
}

pub(crate) fn parse_stream_uri(doc: &Element) -> Option<String> {
    doc.find("MediaUri")
        .and_then(|uri| uri.child("Uri"))
        .map(|uri| uri.text().to_string())
        .filter(|uri| !uri.is_empty())
}

/// Service endpoints advertised by `GetCapabilities`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Capabilities {
    pub media: Option<String>,
    pub ptz: Option<String>,
}

impl Capabilities {
    pub(crate) fn from_xml(doc: &Element) -> Self {
        let Some(caps) = doc.find("Capabilities") else {
            return Self::default();
        };
        let xaddr = |service: &str| {
            caps.find(service)
                .and_then(|s| s.child("XAddr"))
                .map(|x| x.text().to_string())
                .filter(|x| !x.is_empty())
        };

        Self {
            media: xaddr("Media"),
            ptz: xaddr("PTZ"),
        }
    }
}

/// Current PTZ position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PtzStatus {
    pub pan: f64,
    pub tilt: f64,
    pub zoom: f64,
}

impl PtzStatus {
    /// Position from a `GetStatus` response; missing axes read as 0.
    pub(crate) fn from_xml(doc: &Element) -> Option<Self> {
        let position = doc.find("Position")?;
        let axis = |element: &str, attr: &str| {
            position
                .child(element)
                .and_then(|e| e.attr(attr))
                .and_then(|v| v.trim().parse::<f64>().ok())
                .unwrap_or(0.0)
        };

        Some(Self {
            pan: axis("PanTilt", "x"),
            tilt: axis("PanTilt", "y"),
            zoom: axis("Zoom", "x"),
        })
    }
}

/// Closed interval of one axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisRange {
    pub min: f64,
    pub max: f64,
}

impl AxisRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    fn from_xml(range: &Element) -> Option<Self> {
        let bound = |name: &str| range.child(name)?.text().parse::<f64>().ok();
        Some(Self::new(bound("Min")?, bound("Max")?))
    }
}

/// Absolute position limits of the PTZ axes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PtzLimits {
    pub pan: AxisRange,
    pub tilt: AxisRange,
    pub zoom: AxisRange,
}

impl Default for PtzLimits {
    fn default() -> Self {
        Self {
            pan: AxisRange::new(-1.0, 1.0),
            tilt: AxisRange::new(-1.0, 1.0),
            zoom: AxisRange::new(0.0, 1.0),
        }
    }
}

impl PtzLimits {
    /// Limits from `GetConfigurationOptions`; spaces the device omits keep
    /// the generic defaults.
    pub(crate) fn from_xml(doc: &Element) -> Self {
        let mut limits = Self::default();
        let Some(spaces) = doc.find("Spaces") else {
            return limits;
        };

        if let Some(space) = spaces.child("AbsolutePanTiltPositionSpace") {
            if let Some(x) = space.child("XRange").and_then(AxisRange::from_xml) {
                limits.pan = x;
            }
            if let Some(y) = space.child("YRange").and_then(AxisRange::from_xml) {
                limits.tilt = y;
            }
        }
        if let Some(zoom) = spaces
            .child("AbsoluteZoomPositionSpace")
            .and_then(|space| space.child("XRange"))
            .and_then(AxisRange::from_xml)
        {
            limits.zoom = zoom;
        }
        limits
    }
}

/// PTZ capability of a camera.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PtzInfo {
    pub supported: bool,
    pub status: Option<PtzStatus>,
    pub limits: Option<PtzLimits>,
}

impl PtzInfo {
    pub fn unsupported() -> Self {
        Self::default()
    }
}

/// How complete the inspection of a camera is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InspectionStatus {
    /// Identity and profiles were read.
    Ok,
    /// Authenticated, but some queries failed or came back empty.
    IncompleteData,
    /// No session, nothing inspected.
    Unauthenticated,
}

impl fmt::Display for InspectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::IncompleteData => write!(f, "incomplete_data"),
            Self::Unauthenticated => write!(f, "unauthenticated"),
        }
    }
}

/// Everything learned about an authenticated camera.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraDetails {
    pub identity: DeviceIdentity,
    pub profiles: Vec<StreamProfile>,
    pub ptz: PtzInfo,
    pub status: InspectionStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml;

    #[test]
    fn test_identity() {
        let doc = xml::parse(
            r#"<s:Envelope><s:Body><tds:GetDeviceInformationResponse>
              <tds:Manufacturer>Hikvision</tds:Manufacturer>
              <tds:Model>DS-2CD2042WD-I</tds:Model>
              <tds:FirmwareVersion>V5.4.5</tds:FirmwareVersion>
              <tds:SerialNumber>DS-2CD2042WD-I20170101</tds:SerialNumber>
              <tds:HardwareId/>
            </tds:GetDeviceInformationResponse></s:Body></s:Envelope>"#,
        )
        .unwrap();

        let identity = DeviceIdentity::from_xml(&doc);
        assert_eq!(identity.manufacturer.as_deref(), Some("Hikvision"));
        assert_eq!(identity.firmware_version.as_deref(), Some("V5.4.5"));
        assert_eq!(identity.hardware_id, None);
        assert!(identity.is_complete());
    }

    #[test]
    fn test_profiles_and_stream_uri() {
        let doc = xml::parse(
            r#"<Envelope><Body><trt:GetProfilesResponse>
              <trt:Profiles token="main" fixed="true"><tt:Name>MainStream</tt:Name>
                <tt:PTZConfiguration token="ptz0"><tt:Name>PTZ</tt:Name></tt:PTZConfiguration>
              </trt:Profiles>
              <trt:Profiles token="sub"><tt:Name>SubStream</tt:Name></trt:Profiles>
              <trt:Profiles><tt:Name>broken</tt:Name></trt:Profiles>
            </trt:GetProfilesResponse></Body></Envelope>"#,
        )
        .unwrap();

        let profiles = parse_profiles(&doc);
        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[0].name, "MainStream");
        assert_eq!(profiles[0].ptz_configuration.as_deref(), Some("ptz0"));
        assert_eq!(profiles[1].token, "sub");
        assert_eq!(profiles[1].ptz_configuration, None);

        let uri = xml::parse(
            "<Envelope><Body><GetStreamUriResponse><MediaUri>\
             <Uri>rtsp://192.168.1.100:554/Streaming/Channels/101</Uri>\
             <InvalidAfterConnect>false</InvalidAfterConnect></MediaUri>\
             </GetStreamUriResponse></Body></Envelope>",
        )
        .unwrap();
        assert_eq!(
            parse_stream_uri(&uri).as_deref(),
            Some("rtsp://192.168.1.100:554/Streaming/Channels/101")
        );
    }

    #[test]
    fn test_capabilities() {
        let doc = xml::parse(
            r#"<Envelope><Body><GetCapabilitiesResponse><Capabilities>
              <Device><XAddr>http://10.0.0.5/onvif/device_service</XAddr></Device>
              <Media><XAddr>http://10.0.0.5/onvif/Media</XAddr></Media>
            </Capabilities></GetCapabilitiesResponse></Body></Envelope>"#,
        )
        .unwrap();

        let caps = Capabilities::from_xml(&doc);
        assert_eq!(caps.media.as_deref(), Some("http://10.0.0.5/onvif/Media"));
        assert_eq!(caps.ptz, None);
    }

    #[test]
    fn test_ptz_status() {
        let doc = xml::parse(
            r#"<Envelope><Body><GetStatusResponse><PTZStatus>
              <tt:Position><tt:PanTilt x="0.25" y="-0.5"/></tt:Position>
              <tt:MoveStatus><tt:PanTilt>IDLE</tt:PanTilt></tt:MoveStatus>
            </PTZStatus></GetStatusResponse></Body></Envelope>"#,
        )
        .unwrap();

        let status = PtzStatus::from_xml(&doc).unwrap();
        assert_eq!(status, PtzStatus { pan: 0.25, tilt: -0.5, zoom: 0.0 });

        let empty = xml::parse("<Envelope><Body><GetStatusResponse/></Body></Envelope>").unwrap();
        assert_eq!(PtzStatus::from_xml(&empty), None);
    }

    #[test]
    fn test_ptz_limits_keep_defaults_for_missing_spaces() {
        let doc = xml::parse(
            r#"<Envelope><Body><GetConfigurationOptionsResponse><PTZConfigurationOptions><Spaces>
              <AbsolutePanTiltPositionSpace>
                <URI>http://www.onvif.org/ver10/tptz/PanTiltSpaces/PositionGenericSpace</URI>
                <XRange><Min>-0.5</Min><Max>0.5</Max></XRange>
                <YRange><Min>-0.2</Min><Max>1</Max></YRange>
              </AbsolutePanTiltPositionSpace>
            </Spaces></PTZConfigurationOptions></GetConfigurationOptionsResponse></Body></Envelope>"#,
        )
        .unwrap();

        let limits = PtzLimits::from_xml(&doc);
        assert_eq!(limits.pan, AxisRange::new(-0.5, 0.5));
        assert_eq!(limits.tilt, AxisRange::new(-0.2, 1.0));
        assert_eq!(limits.zoom, AxisRange::new(0.0, 1.0));
    }

    #[test]
    fn test_inspection_status_serde() {
        assert_eq!(
            serde_json::to_string(&InspectionStatus::IncompleteData).unwrap(),
            "\"incomplete_data\""
        );
        assert_eq!(InspectionStatus::Ok.to_string(), "ok");
    }
}

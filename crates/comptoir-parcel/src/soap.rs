//! # Colissimo SOAP Messages
//!
//! Request envelope for the `track` operation and parsing of its response.
//!
//! ## Response Shape
//! ```text
//!   soap:Envelope
//!     └── soap:Body
//!           └── ns1:trackResponse
//!                 └── return
//!                       ├── errorCode          0 = OK
//!                       ├── errorMessage
//!                       ├── eventCode / eventDate / eventLibelle / eventSite
//!                       ├── recipientCity / recipientZipCode / recipientCountryCode
//!                       └── skybillNumber
//! ```
//! Only local names are compared, so any namespace prefix is accepted.

use comptoir_core::parcel::{ParcelStatus, TrackingEvent};
use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::{ParcelError, ParcelResult};

pub const TRACKING_NAMESPACE: &str = "http://chargeur.tracking.geopost.com/";

/// Builds the SOAP 1.1 envelope of a `track` call.
pub fn track_envelope(account_number: &str, password: &str, skybill_number: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/" xmlns:char="{TRACKING_NAMESPACE}">
  <soapenv:Header/>
  <soapenv:Body>
    <char:track>
      <accountNumber>{}</accountNumber>
      <password>{}</password>
      <skybillNumber>{}</skybillNumber>
    </char:track>
  </soapenv:Body>
</soapenv:Envelope>"#,
        escape(account_number),
        escape(password),
        escape(skybill_number),
    )
}

/// Content of the `return` element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackResponse {
    pub error_code: i32,
    pub error_message: Option<String>,
    pub event_code: Option<String>,
    pub event_date: Option<String>,
    pub event_libelle: Option<String>,
    pub event_site: Option<String>,
    pub recipient_city: Option<String>,
    pub recipient_zip_code: Option<String>,
    pub recipient_country_code: Option<String>,
    pub skybill_number: Option<String>,
}

impl TrackResponse {
    /// Maps the vendor error code.
    ///
    /// | code      | result                    |
    /// |-----------|---------------------------|
    /// | 0         | `Ok(ParcelStatus)`        |
    /// | 201, 202  | `ParcelError::AuthFailed` |
    /// | 105       | `ParcelError::NotFound`   |
    /// | other     | `ParcelError::Vendor`     |
    pub fn into_status(self, requested: &str) -> ParcelResult<ParcelStatus> {
        match self.error_code {
            0 => {}
            201 | 202 => return Err(ParcelError::AuthFailed),
            105 => return Err(ParcelError::NotFound(requested.to_string())),
            code => {
                return Err(ParcelError::Vendor {
                    code,
                    message: self.error_message.unwrap_or_default(),
                })
            }
        }

        let event = self.event_code.map(|code| TrackingEvent {
            code,
            date: self.event_date,
            label: self.event_libelle.unwrap_or_default(),
            site: self.event_site,
        });

        Ok(ParcelStatus {
            tracking_number: self
                .skybill_number
                .unwrap_or_else(|| requested.to_string()),
            event,
            recipient_city: self.recipient_city,
            recipient_zip_code: self.recipient_zip_code,
            recipient_country_code: self.recipient_country_code,
        })
    }
}

/// Parses a `trackResponse` document.
///
/// A SOAP fault becomes `ParcelError::Vendor` with code `-1`.
pub fn parse_track_response(xml: &str) -> ParcelResult<TrackResponse> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut response = TrackResponse::default();
    let mut in_return = false;
    let mut seen_return = false;
    let mut error_code: Option<String> = None;
    let mut fault: Option<String> = None;
    let mut current: Option<String> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                if name == "return" {
                    in_return = true;
                    seen_return = true;
                }
                current = Some(name);
            }
            Event::Text(t) => {
                let text = t.unescape()?.into_owned();
                match current.as_deref() {
                    Some("faultstring") => fault = Some(text),
                    Some(field) if in_return => {
                        if field == "errorCode" {
                            error_code = Some(text);
                        } else {
                            assign(&mut response, field, text);
                        }
                    }
                    _ => {}
                }
            }
            Event::End(e) => {
                if e.local_name().as_ref() == b"return" {
                    in_return = false;
                }
                current = None;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(message) = fault {
        return Err(ParcelError::Vendor { code: -1, message });
    }
    if !seen_return {
        return Err(ParcelError::Parse("missing return element".to_string()));
    }

    response.error_code = match error_code {
        Some(code) => code
            .trim()
            .parse()
            .map_err(|_| ParcelError::Parse(format!("invalid errorCode '{code}'")))?,
        None => 0,
    };

    Ok(response)
}

fn assign(response: &mut TrackResponse, field: &str, text: String) {
    let slot = match field {
        "errorMessage" => &mut response.error_message,
        "eventCode" => &mut response.event_code,
        "eventDate" => &mut response.event_date,
        "eventLibelle" => &mut response.event_libelle,
        "eventSite" => &mut response.event_site,
        "recipientCity" => &mut response.recipient_city,
        "recipientZipCode" => &mut response.recipient_zip_code,
        "recipientCountryCode" => &mut response.recipient_country_code,
        "skybillNumber" => &mut response.skybill_number,
        _ => return,
    };
    *slot = Some(text);
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn response_xml(error_code: i32, body: &str) -> String {
        format!(
            r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Body>
    <ns1:trackResponse xmlns:ns1="http://chargeur.tracking.geopost.com/">
      <return>
        <errorCode>{error_code}</errorCode>
        {body}
      </return>
    </ns1:trackResponse>
  </soap:Body>
</soap:Envelope>"#
        )
    }

    pub(crate) const DELIVERED: &str = r#"
        <errorMessage>La requête a été traitée avec succès</errorMessage>
        <eventCode>LIVCFM</eventCode>
        <eventDate>2024-03-12T10:31:00+01:00</eventDate>
        <eventLibelle>Votre colis est livré</eventLibelle>
        <eventSite>PLATEFORME COLIS</eventSite>
        <recipientCity>ANGERS</recipientCity>
        <recipientCountryCode>FR</recipientCountryCode>
        <recipientZipCode>49000</recipientZipCode>
        <skybillNumber>6A12345678901</skybillNumber>"#;

    #[test]
    fn test_envelope_escapes_values() {
        let xml = track_envelope("123456", "p<&>\"ss", "6A12345678901");
        assert!(xml.contains("<accountNumber>123456</accountNumber>"));
        assert!(xml.contains("<password>p&lt;&amp;&gt;&quot;ss</password>"));
        assert!(xml.contains("<skybillNumber>6A12345678901</skybillNumber>"));
        assert!(xml.contains(TRACKING_NAMESPACE));
    }

    #[test]
    fn test_parse_delivered_parcel() {
        let response = parse_track_response(&response_xml(0, DELIVERED)).unwrap();
        assert_eq!(response.error_code, 0);
        assert_eq!(response.event_code.as_deref(), Some("LIVCFM"));
        assert_eq!(response.event_libelle.as_deref(), Some("Votre colis est livré"));

        let status = response.into_status("6A12345678901").unwrap();
        assert_eq!(status.status_label(), Some("Votre colis est livré"));
        assert_eq!(status.recipient_city.as_deref(), Some("ANGERS"));
        assert_eq!(status.recipient_zip_code.as_deref(), Some("49000"));
    }

    #[test]
    fn test_error_code_mapping() {
        for code in [201, 202] {
            let response = parse_track_response(&response_xml(code, "")).unwrap();
            assert!(matches!(response.into_status("X"), Err(ParcelError::AuthFailed)));
        }

        let response = parse_track_response(&response_xml(105, "")).unwrap();
        assert!(matches!(
            response.into_status("6A00000000000"),
            Err(ParcelError::NotFound(n)) if n == "6A00000000000"
        ));

        let body = "<errorMessage>Service indisponible</errorMessage>";
        let response = parse_track_response(&response_xml(1000, body)).unwrap();
        match response.into_status("X") {
            Err(ParcelError::Vendor { code, message }) => {
                assert_eq!(code, 1000);
                assert_eq!(message, "Service indisponible");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_soap_fault() {
        let xml = r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Body><soap:Fault><faultcode>soap:Server</faultcode><faultstring>boom</faultstring></soap:Fault></soap:Body>
</soap:Envelope>"#;
        assert!(matches!(
            parse_track_response(xml),
            Err(ParcelError::Vendor { code: -1, .. })
        ));
    }

    #[test]
    fn test_missing_return() {
        assert!(matches!(
            parse_track_response("<html><body>maintenance</body></html>"),
            Err(ParcelError::Parse(_))
        ));
    }
}

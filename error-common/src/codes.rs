// Wire constants of the CAS 3.0 and SAML 2.0 protocols

pub mod protocol {
    /// Ticket not recognized, expired, already used or issued for another service.
    pub const INVALID_TICKET: &str = "INVALID_TICKET";
}

/// Namespace URI of the `cas:` prefix in XML service responses.
pub const CAS_XML_NAMESPACE: &str = "http://www.yale.edu/tp/cas";

/// SAML 2.0 namespaces used by single-logout requests.
pub mod saml {
    pub const PROTOCOL_NAMESPACE: &str = "urn:oasis:names:tc:SAML:2.0:protocol";
    pub const ASSERTION_NAMESPACE: &str = "urn:oasis:names:tc:SAML:2.0:assertion";
}

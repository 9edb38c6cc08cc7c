//! C header generation for companion firmware libraries
//!
//! The generated header pins every addressable endpoint to its numeric id
//! and type together with the schema checksum, so an embedded client can
//! talk to a device without fetching the schema itself.

use std::fmt;

use crate::endpoint::EndpointKind;
use crate::tree::EndpointTree;

/// Firmware version reported by the device
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FirmwareVersion {
    pub major: u8,
    pub minor: u8,
    pub revision: u8,
    pub unreleased: u8,
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}:{}",
            self.major, self.minor, self.revision, self.unreleased
        )
    }
}

/// Macro-style name: upper-cased identifier with `.` replaced by `_`
pub fn macro_name(identifier: &str) -> String {
    identifier
        .chars()
        .map(|c| if c == '.' { '_' } else { c.to_ascii_uppercase() })
        .collect()
}

/// C type for an endpoint kind; functions are triggered with a bool
pub fn c_type_name(kind: EndpointKind) -> &'static str {
    match kind {
        EndpointKind::Scalar(ty) => ty.c_type(),
        EndpointKind::Function | EndpointKind::Object => "bool",
    }
}

/// Render the endpoint definitions header
pub fn export_header(tree: &EndpointTree, checksum: u16, firmware: &FirmwareVersion) -> String {
    let crc = format!("0x{:04X}", checksum);
    let mut file = String::new();

    file.push_str("\n// This file was auto-generated by odlink\n");
    file.push_str("// It defines the endpoints for use with the ODriveNativeLib Arduino library\n");
    file.push_str(&format!("// FW version: {} with JSON CRC {}\n", firmware, crc));
    file.push_str(
        "//\n\
         // Example:\n\
         //\n\
         //  odrv0.sendReadRequest<ENDPOINT_VBUS_VOLTAGE>();\n\
         //\n\
         // or\n\
         //\n\
         //  void OnDataCallback(uint16_t endpointID, uint8_t* data, size_t dataSize) {\n\
         //  \n\
         //      switch (endpointID) {\n\
         //          ENDPOINT_CASE(vbus_voltage, ENDPOINT_VBUS_VOLTAGE); break;\n\
         //          ENDPOINT_DEFAULT_CASE();\n\
         //      }\n\
         //  }\n\
         //\n\
         // ENDPOINT_CASE and ENDPOINT_DEFAULT_CASE should be defined in <ODrive.h> from the ODriveNativeLib\n\
         //\n\n",
    );

    file.push_str("#ifndef __ENDPOINTS_H\n#define __ENDPOINTS_H\n\n");
    file.push_str(&format!("#define JSON_CRC {}\n\n", crc));

    for endpoint in tree.addressable() {
        let Some(id) = endpoint.id else {
            continue;
        };
        let name = macro_name(&endpoint.identifier);
        file.push_str(&format!(
            "#define ENDPOINT_TYPE_{name} {}\n",
            c_type_name(endpoint.kind)
        ));
        file.push_str(&format!("#define ENDPOINT_ID_{name} {id}\n"));
        file.push_str(&format!(
            "#define ENDPOINT_{name} JSON_CRC, ENDPOINT_ID_{name}, ENDPOINT_TYPE_{name}\n\n"
        ));
    }

    file.push_str("#endif // __ENDPOINTS_H\n");
    file
}

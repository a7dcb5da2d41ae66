//! Constants for the UDS Client.
use strum_macros::{EnumIter, FromRepr, IntoStaticStr};

pub static POSITIVE_RESPONSE: u8 = 0x40;
pub static NEGATIVE_RESPONSE: u8 = 0x7f;

/// Service Identifiers (SIDs) as defined in ISO 14229, limited to the services used here
#[derive(Debug, PartialEq, Copy, Clone, FromRepr)]
#[repr(u8)]
pub enum ServiceIdentifier {
    DiagnosticSessionControl = 0x10,
    ReadDataByIdentifier = 0x22,
    TesterPresent = 0x3e,
}

/// Standard Data Identifiers (DIDs) as defined in ISO 14229
#[derive(Debug, PartialEq, Copy, Clone, EnumIter, FromRepr, IntoStaticStr)]
#[repr(u16)]
pub enum DataIdentifier {
    BootSoftwareIdentification = 0xf180,
    ApplicationSoftwareIdentification = 0xf181,
    ApplicationDataIdentification = 0xf182,
    BootSoftwareFingerprint = 0xf183,
    ApplicationSoftwareFingerprint = 0xf184,
    ApplicationDataFingerprint = 0xf185,
    ActiveDiagnosticSession = 0xf186,
    VehicleManufacturerSparePartNumber = 0xf187,
    VehicleManufacturerEcuSoftwareNumber = 0xf188,
    VehicleManufacturerEcuSoftwareVersionNumber = 0xf189,
    SystemSupplierIdentifier = 0xf18a,
    EcuManufacturingDate = 0xf18b,
    EcuSerialNumber = 0xf18c,
    SupportedFunctionalUnits = 0xf18d,
    VehicleManufacturerKitAssemblyPartNumber = 0xf18e,
    Vin = 0xf190,
    VehicleManufacturerEcuHardwareNumber = 0xf191,
    SystemSupplierEcuHardwareNumber = 0xf192,
    SystemSupplierEcuHardwareVersionNumber = 0xf193,
    SystemSupplierEcuSoftwareNumber = 0xf194,
    SystemSupplierEcuSoftwareVersionNumber = 0xf195,
    ExhaustRegulationOrTypeApprovalNumber = 0xf196,
    SystemNameOrEngineType = 0xf197,
    RepairShopCodeOrTesterSerialNumber = 0xf198,
    ProgrammingDate = 0xf199,
    CalibrationRepairShopCodeOrCalibrationEquipmentSerialNumber = 0xf19a,
    CalibrationDate = 0xf19b,
    CalibrationEquipmentSoftwareNumber = 0xf19c,
    EcuInstallationDate = 0xf19d,
    OdxFile = 0xf19e,
    Entity = 0xf19f,
}

/// Diagnostic Session Type Sub-Function ID as defined in ISO 14229
#[derive(Debug, PartialEq, Copy, Clone, EnumIter, FromRepr)]
#[repr(u8)]
pub enum SessionType {
    Default = 0x01,
    Programming = 0x02,
    ExtendedDiagnostic = 0x03,
    SafetySystemDiagnostic = 0x04,
}

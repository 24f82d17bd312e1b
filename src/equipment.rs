use serde::Deserialize;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EquipmentClass {
    Unknown,
    Pistol,
    SMG,
    Heavy,
    Rifle,
    Equipment,
    Grenade,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EquipmentElement {
    Unknown,
    // Pistols
    P2000,
    Glock,
    P250,
    Deagle,
    FiveSeven,
    DualBarettas,
    Tec9,
    CZ,
    USP,
    Revolver,
    // SMGs
    MP7,
    MP9,
    Bizon,
    Mac10,
    UMP,
    P90,
    MP5SD,
    // Heavy
    SawedOff,
    Nova,
    Swag7,
    XM1014,
    M249,
    Negev,
    // Rifles
    Gallil,
    Famas,
    AK47,
    M4A4,
    M4A1,
    Scout,
    SG556,
    AUG,
    AWP,
    Scar20,
    G3SG1,
    // Equipment
    Zeus,
    Kevlar,
    Helmet,
    Bomb,
    Knife,
    DefuseKit,
    World,
    // Grenades
    Decoy,
    Molotov,
    Incendiary,
    Flash,
    Smoke,
    HE,
}

impl EquipmentElement {
    pub fn class(&self) -> EquipmentClass {
        use EquipmentElement::*;
        match self {
            Unknown => EquipmentClass::Unknown,
            P2000 | Glock | P250 | Deagle | FiveSeven | DualBarettas | Tec9 | CZ | USP | Revolver => EquipmentClass::Pistol,
            MP7 | MP9 | Bizon | Mac10 | UMP | P90 | MP5SD => EquipmentClass::SMG,
            SawedOff | Nova | Swag7 | XM1014 | M249 | Negev => EquipmentClass::Heavy,
            Gallil | Famas | AK47 | M4A4 | M4A1 | Scout | SG556 | AUG | AWP | Scar20 | G3SG1 => EquipmentClass::Rifle,
            Zeus | Kevlar | Helmet | Bomb | Knife | DefuseKit | World => EquipmentClass::Equipment,
            Decoy | Molotov | Incendiary | Flash | Smoke | HE => EquipmentClass::Grenade,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Equipment {
    pub weapon: EquipmentElement,
    pub original_string: String,
}

impl Equipment {
    pub fn from_name(name: &str) -> Equipment {
        Equipment {
            weapon: map_equipment(name).unwrap_or(EquipmentElement::Unknown),
            original_string: name.to_string(),
        }
    }
}

/// Maps a weapon name as used in game events and class names (without the "weapon_" prefix).
pub fn map_equipment(name: &str) -> Option<EquipmentElement> {
    let name = name.strip_prefix("weapon_").unwrap_or(name);
    if name.contains("knife") || name == "bayonet" {
        return Some(EquipmentElement::Knife);
    }
    use EquipmentElement::*;
    let eq = match name {
        "ak47" => AK47,
        "aug" => AUG,
        "awp" => AWP,
        "bizon" => Bizon,
        "c4" => Bomb,
        "deagle" => Deagle,
        "decoy" | "decoygrenade" | "decoy_projectile" => Decoy,
        "elite" => DualBarettas,
        "famas" => Famas,
        "fiveseven" => FiveSeven,
        "flashbang" => Flash,
        "g3sg1" => G3SG1,
        "galil" | "galilar" => Gallil,
        "glock" => Glock,
        "hegrenade" => HE,
        "hkp2000" | "p2000" => P2000,
        "incgrenade" | "incendiarygrenade" | "inferno" => Incendiary,
        "m249" => M249,
        "m4a1" => M4A4,
        "m4a1_silencer" | "m4a1_silencer_off" => M4A1,
        "mac10" => Mac10,
        "mag7" => Swag7,
        "molotov" | "molotovgrenade" | "molotov_projectile" => Molotov,
        "mp5sd" => MP5SD,
        "mp7" => MP7,
        "mp9" => MP9,
        "negev" => Negev,
        "nova" => Nova,
        "p250" => P250,
        "p90" => P90,
        "revolver" => Revolver,
        "sawedoff" => SawedOff,
        "scar20" => Scar20,
        "sg556" => SG556,
        "smokegrenade" => Smoke,
        "ssg08" => Scout,
        "taser" => Zeus,
        "tec9" => Tec9,
        "ump45" => UMP,
        "xm1014" => XM1014,
        "cz75a" => CZ,
        "usp_silencer" | "usp_silencer_off" | "usp" => USP,
        "world" => World,
        "vest" => Kevlar,
        "vesthelm" => Helmet,
        "defuser" => DefuseKit,
        _ => return None,
    };
    Some(eq)
}

/// Equipment kind of a networked class, derived from its data table name.
pub fn equipment_from_dt_name(dt_name: &str) -> Option<EquipmentElement> {
    if let Some(weapon) = dt_name.strip_prefix("DT_Weapon") {
        return map_equipment(&weapon.to_lowercase());
    }
    match dt_name {
        "DT_Flashbang" => Some(EquipmentElement::Flash),
        "DT_SmokeGrenade" => Some(EquipmentElement::Smoke),
        "DT_HEGrenade" => Some(EquipmentElement::HE),
        "DT_DecoyGrenade" => Some(EquipmentElement::Decoy),
        "DT_IncendiaryGrenade" => Some(EquipmentElement::Incendiary),
        "DT_MolotovGrenade" => Some(EquipmentElement::Molotov),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_equipment() {
        assert_eq!(map_equipment("ak47"), Some(EquipmentElement::AK47));
        assert_eq!(map_equipment("weapon_awp"), Some(EquipmentElement::AWP));
        assert_eq!(map_equipment("knife_karambit"), Some(EquipmentElement::Knife));
        assert_eq!(map_equipment("bayonet"), Some(EquipmentElement::Knife));
        assert_eq!(map_equipment("m4a1_silencer"), Some(EquipmentElement::M4A1));
        assert_eq!(map_equipment("chicken"), None);
    }
    #[test]
    fn test_dt_names() {
        assert_eq!(equipment_from_dt_name("DT_WeaponAK47"), Some(EquipmentElement::AK47));
        assert_eq!(equipment_from_dt_name("DT_WeaponHKP2000"), Some(EquipmentElement::P2000));
        assert_eq!(equipment_from_dt_name("DT_WeaponNOVA"), Some(EquipmentElement::Nova));
        assert_eq!(equipment_from_dt_name("DT_MolotovGrenade"), Some(EquipmentElement::Molotov));
        assert_eq!(equipment_from_dt_name("DT_WeaponCSBase"), None);
        assert_eq!(equipment_from_dt_name("DT_CSPlayer"), None);
    }
    #[test]
    fn test_equipment_class() {
        assert_eq!(EquipmentElement::AK47.class(), EquipmentClass::Rifle);
        assert_eq!(EquipmentElement::Flash.class(), EquipmentClass::Grenade);
        assert_eq!(Equipment::from_name("chicken").weapon, EquipmentElement::Unknown);
    }
}

//! Serde adapters that encode coordinates as `[lon, lat]` pairs.

use geo::Coord;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

const fn to_pair(coord: &Coord<f64>) -> [f64; 2] {
    [coord.x, coord.y]
}

const fn from_pair([x, y]: [f64; 2]) -> Coord<f64> {
    Coord { x, y }
}

pub(crate) mod lon_lat {
    use super::*;

    pub(crate) fn serialize<S: Serializer>(
        coord: &Coord<f64>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        to_pair(coord).serialize(serializer)
    }

    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Coord<f64>, D::Error> {
        <[f64; 2]>::deserialize(deserializer).map(from_pair)
    }
}

pub(crate) mod lon_lat_seq {
    use super::*;

    pub(crate) fn serialize<S: Serializer>(
        coords: &[Coord<f64>],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(coords.iter().map(to_pair))
    }

    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<Coord<f64>>, D::Error> {
        let pairs = Vec::<[f64; 2]>::deserialize(deserializer)?;
        Ok(pairs.into_iter().map(from_pair).collect())
    }
}

pub(crate) mod lon_lat_seq_opt {
    use super::*;

    #[expect(
        clippy::ref_option,
        reason = "serde `with` modules receive a reference to the field type"
    )]
    pub(crate) fn serialize<S: Serializer>(
        coords: &Option<Vec<Coord<f64>>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match coords {
            Some(values) => {
                let pairs: Vec<[f64; 2]> = values.iter().map(to_pair).collect();
                serializer.serialize_some(&pairs)
            }
            None => serializer.serialize_none(),
        }
    }

    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<Coord<f64>>>, D::Error> {
        let pairs = Option::<Vec<[f64; 2]>>::deserialize(deserializer)?;
        Ok(pairs.map(|values| values.into_iter().map(from_pair).collect()))
    }
}
